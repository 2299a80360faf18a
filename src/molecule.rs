//! XYZ molecular geometry container.

use color_eyre::eyre::{bail, eyre, Result};
use nalgebra::Vector3;
use periodic_table_on_an_enum::Element;
use std::fmt;
use std::str::FromStr;

pub const BOHR_PER_ANGSTROM: f64 = 1.889725989;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Angstrom,
    Bohr,
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Angstrom => write!(f, "Angstrom"),
            Units::Bohr => write!(f, "Bohr"),
        }
    }
}

/// An ordered list of atoms with Cartesian coordinates in `units`.
///
/// `Clone` produces a deep copy with independent coordinate storage.
#[derive(Debug, Clone)]
pub struct Molecule {
    pub elements: Vec<Element>,
    pub geom: Vec<Vector3<f64>>,
    pub units: Units,
}

impl Molecule {
    /// Parse XYZ-format text: an atom count line, a comment line (recognized
    /// as a units label when it reads `Bohr` or `Angstrom`), then one
    /// `<symbol> <x> <y> <z>` line per atom. Blank lines are skipped.
    ///
    /// Fails fast when the declared count disagrees with the parsed lines or
    /// an element symbol is unknown; no partial state is returned.
    pub fn parse(text: &str) -> Result<Molecule> {
        let mut lines = text.lines();
        let count_line = lines
            .next()
            .ok_or_else(|| eyre!("geometry text is empty"))?;
        let declared: usize = count_line
            .trim()
            .parse()
            .map_err(|_| eyre!("first line of a geometry must be the atom count, got {:?}", count_line))?;

        let units = match lines.next().map(str::trim) {
            Some(label) if label.eq_ignore_ascii_case("bohr") => Units::Bohr,
            Some(_) => Units::Angstrom,
            None => bail!("geometry text ends after the atom count line"),
        };

        let mut elements = Vec::new();
        let mut geom = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let &[symbol, x, y, z] = fields.as_slice() else {
                bail!("malformed geometry line {:?}: expected `<symbol> <x> <y> <z>`", line);
            };
            let element = Element::from_symbol(symbol)
                .ok_or_else(|| eyre!("unknown element symbol {:?}", symbol))?;
            let parse_coord = |field: &str| {
                field
                    .parse::<f64>()
                    .map_err(|_| eyre!("bad coordinate {:?} in line {:?}", field, line))
            };
            let coord = Vector3::new(parse_coord(x)?, parse_coord(y)?, parse_coord(z)?);
            elements.push(element);
            geom.push(coord);
        }

        if declared != geom.len() {
            bail!(
                "geometry declares {} atoms but {} coordinate lines were found",
                declared,
                geom.len()
            );
        }

        Ok(Molecule {
            elements,
            geom,
            units,
        })
    }

    pub fn natom(&self) -> usize {
        self.geom.len()
    }

    /// Number of Cartesian degrees of freedom, 3N.
    pub fn ncoord(&self) -> usize {
        3 * self.natom()
    }

    /// Molecular formula with elements in alphabetical order, e.g. `H2O`.
    pub fn formula(&self) -> String {
        let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
        for element in &self.elements {
            *counts.entry(element.get_symbol()).or_insert(0) += 1;
        }
        let mut out = String::new();
        for (symbol, count) in counts {
            out.push_str(symbol);
            if count != 1 {
                out.push_str(&count.to_string());
            }
        }
        out
    }

    /// Sum of the nuclear charges.
    pub fn nuclear_charge(&self) -> u32 {
        self.elements
            .iter()
            .map(|e| e.get_atomic_number() as u32)
            .sum()
    }

    /// Electron count for a given net molecular charge.
    pub fn n_electrons(&self, charge: i32) -> Result<usize> {
        let n = self.nuclear_charge() as i64 - charge as i64;
        if n < 0 {
            bail!(
                "charge {} leaves a molecule with nuclear charge {} without electrons",
                charge,
                self.nuclear_charge()
            );
        }
        Ok(n as usize)
    }

    /// (atomic number, position) pairs in the molecule's current units, the
    /// input shape the integral provider expects.
    pub fn charges_and_coords(&self) -> Vec<(u32, Vector3<f64>)> {
        self.elements
            .iter()
            .zip(&self.geom)
            .map(|(e, &r)| (e.get_atomic_number() as u32, r))
            .collect()
    }

    /// Mutable access to the flat Cartesian coordinate `k` in 0..3N.
    pub fn coord_mut(&mut self, k: usize) -> &mut f64 {
        &mut self.geom[k / 3][k % 3]
    }

    /// Convert the coordinates to Bohr; a no-op if already in Bohr.
    pub fn to_bohr(&mut self) {
        if self.units == Units::Angstrom {
            self.units = Units::Bohr;
            for r in &mut self.geom {
                *r *= BOHR_PER_ANGSTROM;
            }
        }
    }

    /// Convert the coordinates to Angstrom; a no-op if already in Angstrom.
    pub fn to_angstrom(&mut self) {
        if self.units == Units::Bohr {
            self.units = Units::Angstrom;
            for r in &mut self.geom {
                *r /= BOHR_PER_ANGSTROM;
            }
        }
    }
}

impl FromStr for Molecule {
    type Err = color_eyre::eyre::Report;

    fn from_str(s: &str) -> Result<Molecule> {
        Molecule::parse(s)
    }
}

impl fmt::Display for Molecule {
    /// XYZ-format text that [`Molecule::parse`] round-trips.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.natom())?;
        writeln!(f, "{}", self.units)?;
        for (element, r) in self.elements.iter().zip(&self.geom) {
            writeln!(
                f,
                "{:<2} {:>15.10} {:>15.10} {:>15.10}",
                element.get_symbol(),
                r.x,
                r.y,
                r.z
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const WATER: &str = "3\nAngstrom\nO  0.0  0.0  0.1173\nH  0.0  0.7572 -0.4692\nH  0.0 -0.7572 -0.4692\n";

    #[test]
    fn parse_reads_count_symbols_and_units() {
        let mol = Molecule::parse(WATER).unwrap();
        assert_eq!(mol.natom(), 3);
        assert_eq!(mol.units, Units::Angstrom);
        assert_eq!(mol.elements[0].get_symbol(), "O");
        assert_relative_eq!(mol.geom[1].y, 0.7572);
        assert_eq!(mol.nuclear_charge(), 10);
        assert_eq!(mol.formula(), "H2O");
    }

    #[test]
    fn format_parse_round_trip() {
        let mol = Molecule::parse(WATER).unwrap();
        let again = Molecule::parse(&mol.to_string()).unwrap();
        assert_eq!(again.natom(), mol.natom());
        assert_eq!(again.units, mol.units);
        for (a, b) in mol.geom.iter().zip(&again.geom) {
            assert_relative_eq!((a - b).norm(), 0.0, epsilon = 1e-9);
        }
        for (a, b) in mol.elements.iter().zip(&again.elements) {
            assert_eq!(a.get_symbol(), b.get_symbol());
        }
    }

    #[test]
    fn unit_conversion_is_involutive_and_idempotent() {
        let mut mol = Molecule::parse(WATER).unwrap();
        let original = mol.geom.clone();

        mol.to_angstrom(); // already Angstrom: no-op
        assert_eq!(mol.geom, original);

        mol.to_bohr();
        assert_eq!(mol.units, Units::Bohr);
        assert_relative_eq!(mol.geom[1].y, 0.7572 * BOHR_PER_ANGSTROM, epsilon = 1e-12);
        mol.to_bohr(); // no-op in Bohr
        assert_relative_eq!(mol.geom[1].y, 0.7572 * BOHR_PER_ANGSTROM, epsilon = 1e-12);

        mol.to_angstrom();
        for (a, b) in mol.geom.iter().zip(&original) {
            assert_relative_eq!((a - b).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn copies_are_deep() {
        let mol = Molecule::parse(WATER).unwrap();
        let mut copy = mol.clone();
        copy.geom[0].x += 5.0;
        assert_relative_eq!(mol.geom[0].x, 0.0);
        assert_relative_eq!(copy.geom[0].x, 5.0);
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let text = "4\ncomment\nH 0 0 0\nH 0 0 1\n";
        assert!(Molecule::parse(text).is_err());
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let text = "1\ncomment\nXx 0 0 0\n";
        assert!(Molecule::parse(text).is_err());
    }

    #[test]
    fn bohr_label_is_recognized() {
        let mol = Molecule::parse("1\nBohr\nH 0 0 0\n").unwrap();
        assert_eq!(mol.units, Units::Bohr);
    }
}
