//! Fuel coefficient table
//!
//! Parses the semicolon-delimited tables used to describe fuels, e.g.
//!
//! ```text
//! Index;vv_coeff;Kdepth
//! 1;1.0;0.05
//! 2;1.0;0.0
//! ```
//!
//! The first column is the fuel index referenced by the `fuel` indexed layer; every
//! other header names a coefficient. A table is immutable once parsed. Reloading
//! builds a new table and swaps it whole, so a running propagation never observes a
//! partially updated table.

use crate::error::{FireError, Result};
use rustc_hash::FxHashMap;

/// Index → coefficient record mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuelTable {
    names: Vec<String>,
    columns: FxHashMap<String, usize>,
    rows: FxHashMap<i32, Vec<f64>>,
}

impl FuelTable {
    /// Parse a table from text
    ///
    /// Rows are separated by newlines, fields by `;`. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        let header = lines
            .next()
            .ok_or_else(|| FireError::config("fuel table is empty"))?;
        let mut fields = header.split(';').map(str::trim);
        let first = fields.next().unwrap_or_default();
        if !first.eq_ignore_ascii_case("index") {
            return Err(FireError::config(format!(
                "fuel table must start with an 'Index' column, found '{first}'"
            )));
        }
        let names: Vec<String> = fields.map(ToString::to_string).collect();
        let mut columns = FxHashMap::default();
        for (col, name) in names.iter().enumerate() {
            if columns.insert(name.clone(), col).is_some() {
                return Err(FireError::config(format!(
                    "duplicate fuel coefficient column '{name}'"
                )));
            }
        }

        let mut rows = FxHashMap::default();
        for (line_no, line) in lines.enumerate() {
            let cells: Vec<&str> = line.split(';').map(str::trim).collect();
            if cells.len() != names.len() + 1 {
                return Err(FireError::config(format!(
                    "fuel table row {} has {} fields, expected {}",
                    line_no + 2,
                    cells.len(),
                    names.len() + 1
                )));
            }
            let index: i32 = parse_index(cells[0])?;
            let values = cells[1..]
                .iter()
                .map(|cell| {
                    cell.parse::<f64>().map_err(|_| {
                        FireError::config(format!(
                            "fuel {index}: coefficient '{cell}' is not a number"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            if rows.insert(index, values).is_some() {
                return Err(FireError::config(format!("duplicate fuel index {index}")));
            }
        }

        Ok(Self {
            names,
            columns,
            rows,
        })
    }

    /// Coefficient names in column order
    pub fn coefficient_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, index: i32) -> bool {
        self.rows.contains_key(&index)
    }

    /// Fuel indices present in the table, in no particular order
    pub fn indices(&self) -> impl Iterator<Item = i32> + '_ {
        self.rows.keys().copied()
    }

    /// Column position of a coefficient
    pub fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| FireError::UnknownCoefficient(name.to_string()))
    }

    /// Whole coefficient record of a fuel
    pub fn entry(&self, index: i32) -> Result<&[f64]> {
        self.rows
            .get(&index)
            .map(Vec::as_slice)
            .ok_or(FireError::UnknownFuelIndex(index))
    }

    /// Single coefficient of a fuel
    pub fn lookup(&self, index: i32, name: &str) -> Result<f64> {
        let col = self.column(name)?;
        Ok(self.entry(index)?[col])
    }

    /// Gather the coefficients at `columns` for `index`
    pub fn gather(&self, index: i32, columns: &[usize], out: &mut Vec<f64>) -> Result<()> {
        let entry = self.entry(index)?;
        out.clear();
        out.extend(columns.iter().map(|&col| entry[col]));
        Ok(())
    }
}

fn parse_index(cell: &str) -> Result<i32> {
    // Tables written from numpy often carry "1.0" style indices
    cell.parse::<i32>().or_else(|_| {
        cell.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i32)
            .ok_or_else(|| FireError::config(format!("invalid fuel index '{cell}'")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVATURE_TABLE: &str = "Index;vv_coeff;Kcurv;beta\n1;1.0;14.0;6.0\n2;1.0;0.0;1.0";

    #[test]
    fn test_parse_and_lookup() {
        let table = FuelTable::parse(CURVATURE_TABLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.coefficient_names(), ["vv_coeff", "Kcurv", "beta"]);
        assert_eq!(table.lookup(1, "Kcurv").unwrap(), 14.0);
        assert_eq!(table.lookup(2, "beta").unwrap(), 1.0);
    }

    #[test]
    fn test_lookup_failures() {
        let table = FuelTable::parse(CURVATURE_TABLE).unwrap();
        assert_eq!(table.lookup(7, "Kcurv"), Err(FireError::UnknownFuelIndex(7)));
        assert_eq!(
            table.lookup(1, "Kdepth"),
            Err(FireError::UnknownCoefficient("Kdepth".into()))
        );
    }

    #[test]
    fn test_gather_in_requested_order() {
        let table = FuelTable::parse(CURVATURE_TABLE).unwrap();
        let columns = [table.column("beta").unwrap(), table.column("vv_coeff").unwrap()];
        let mut out = Vec::new();
        table.gather(1, &columns, &mut out).unwrap();
        assert_eq!(out, vec![6.0, 1.0]);
    }

    #[test]
    fn test_malformed_tables() {
        assert!(FuelTable::parse("").is_err());
        assert!(FuelTable::parse("Fuel;vv_coeff\n1;1.0").is_err());
        assert!(FuelTable::parse("Index;vv_coeff\n1;1.0;2.0").is_err());
        assert!(FuelTable::parse("Index;vv_coeff\n1;abc").is_err());
        assert!(FuelTable::parse("Index;vv_coeff\n1;1.0\n1;2.0").is_err());
    }

    #[test]
    fn test_float_style_index() {
        let table = FuelTable::parse("Index;vv_coeff\n141.0;2.0\n").unwrap();
        assert_eq!(table.lookup(141, "vv_coeff").unwrap(), 2.0);
    }
}
