use super::lattice::{Lattice, LatticeError};
use crate::core::models::element::Element;
use nalgebra::{Matrix3, Vector3};
use std::collections::HashMap;
use thiserror::Error;

const SITE_MERGE_TOLERANCE: f64 = 1e-4;

const SYMOP_TAGS: [&str; 2] = [
    "_symmetry_equiv_pos_as_xyz",
    "_space_group_symop_operation_xyz",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("missing required CIF tag '{0}'")]
    MissingTag(&'static str),
    #[error("invalid numeric value '{value}' for '{tag}'")]
    InvalidNumber { tag: String, value: String },
    #[error("unknown element in atom site '{0}'")]
    UnknownElement(String),
    #[error("structure contains no atom sites")]
    NoSites,
    #[error("malformed CIF loop: {0}")]
    MalformedLoop(String),
    #[error("invalid symmetry operation '{0}'")]
    InvalidSymmetryOperation(String),
    #[error(transparent)]
    Lattice(#[from] LatticeError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub element: Element,
    pub fractional: Vector3<f64>,
    pub occupancy: f64,
}

/// Atomic sites in a unit cell, after symmetry expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct CrystalStructure {
    lattice: Lattice,
    sites: Vec<Site>,
}

impl CrystalStructure {
    pub fn new(lattice: Lattice, sites: Vec<Site>) -> Result<Self, StructureError> {
        if sites.is_empty() {
            return Err(StructureError::NoSites);
        }
        Ok(Self { lattice, sites })
    }

    /// Parses the CIF subset written by Materials Project style exporters.
    ///
    /// Sites listed in the atom-site loop are expanded by the symmetry operations
    /// (identity when the file has none), wrapped into the unit cell and merged when
    /// they coincide.
    pub fn from_cif(text: &str) -> Result<Self, StructureError> {
        let block = CifBlock::parse(text)?;

        let lattice = Lattice::from_parameters(
            block.number("_cell_length_a")?,
            block.number("_cell_length_b")?,
            block.number("_cell_length_c")?,
            block.number("_cell_angle_alpha")?,
            block.number("_cell_angle_beta")?,
            block.number("_cell_angle_gamma")?,
        )?;

        let operations = block.symmetry_operations()?;
        let asymmetric_sites = block.atom_sites()?;

        let mut sites: Vec<Site> = Vec::new();
        for site in &asymmetric_sites {
            for op in &operations {
                let position = wrap_fractional(&op.apply(&site.fractional));
                let duplicate = sites.iter().any(|existing| {
                    existing.element == site.element
                        && periodic_distance(&existing.fractional, &position) < SITE_MERGE_TOLERANCE
                });
                if !duplicate {
                    sites.push(Site {
                        element: site.element,
                        fractional: position,
                        occupancy: site.occupancy,
                    });
                }
            }
        }

        Self::new(lattice, sites)
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Distinct elements present, ordered by atomic number.
    pub fn elements(&self) -> Vec<Element> {
        let mut elements: Vec<Element> = self.sites.iter().map(|s| s.element).collect();
        elements.sort();
        elements.dedup();
        elements
    }
}

fn wrap_fractional(v: &Vector3<f64>) -> Vector3<f64> {
    v.map(|x| {
        let wrapped = x - x.floor();
        if (1.0 - wrapped).abs() < 1e-8 {
            0.0
        } else {
            wrapped
        }
    })
}

fn periodic_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a - b).map(|d| (d - d.round()).abs()).max()
}

#[derive(Debug, Clone, PartialEq)]
struct SymmetryOperation {
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl SymmetryOperation {
    fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    fn parse(raw: &str) -> Result<Self, StructureError> {
        let invalid = || StructureError::InvalidSymmetryOperation(raw.to_string());
        let components: Vec<&str> = raw.split(',').collect();
        if components.len() != 3 {
            return Err(invalid());
        }

        let mut rotation = Matrix3::zeros();
        let mut translation = Vector3::zeros();
        for (row, component) in components.iter().enumerate() {
            let (coefficients, constant) = parse_symop_component(component).ok_or_else(invalid)?;
            for (col, value) in coefficients.iter().enumerate() {
                rotation[(row, col)] = *value;
            }
            translation[row] = constant;
        }
        Ok(Self {
            rotation,
            translation,
        })
    }

    fn apply(&self, fractional: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * fractional + self.translation
    }
}

fn parse_symop_component(component: &str) -> Option<([f64; 3], f64)> {
    let expr: String = component
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if expr.is_empty() {
        return None;
    }

    let mut terms: Vec<(f64, String)> = Vec::new();
    let mut sign = 1.0;
    let mut current = String::new();
    for c in expr.chars() {
        if c == '+' || c == '-' {
            if !current.is_empty() {
                terms.push((sign, std::mem::take(&mut current)));
            }
            sign = if c == '-' { -1.0 } else { 1.0 };
        } else {
            current.push(c);
        }
    }
    if current.is_empty() {
        return None;
    }
    terms.push((sign, current));

    let mut coefficients = [0.0; 3];
    let mut constant = 0.0;
    for (sign, term) in terms {
        let axis = match term.chars().last() {
            Some('x') => Some(0),
            Some('y') => Some(1),
            Some('z') => Some(2),
            _ => None,
        };
        match axis {
            Some(axis) => {
                let factor = term[..term.len() - 1].trim_end_matches('*');
                let factor = if factor.is_empty() {
                    1.0
                } else {
                    parse_fraction(factor)?
                };
                coefficients[axis] += sign * factor;
            }
            None => constant += sign * parse_fraction(&term)?,
        }
    }
    Some((coefficients, constant))
}

fn parse_fraction(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then_some(num.parse::<f64>().ok()? / den)
        }
        None => s.parse().ok(),
    }
}

/// Strips a trailing standard uncertainty, e.g. `5.4307(2)`. `None` for CIF null values.
fn parse_cif_number(value: &str) -> Option<Result<f64, ()>> {
    let value = value.trim();
    if value == "." || value == "?" {
        return None;
    }
    let numeric = value.split('(').next().unwrap_or(value);
    Some(numeric.parse::<f64>().map_err(|_| ()))
}

#[derive(Debug, Default)]
struct CifLoop {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CifLoop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == tag)
    }
}

#[derive(Debug, Default)]
struct CifBlock {
    tags: HashMap<String, String>,
    loops: Vec<CifLoop>,
}

impl CifBlock {
    fn parse(text: &str) -> Result<Self, StructureError> {
        let mut block = CifBlock::default();
        let mut lines = text.lines().map(str::trim).peekable();

        while let Some(line) = lines.next() {
            if line.is_empty() || line.starts_with('#') || line.starts_with("data_") {
                continue;
            }
            if line.starts_with(';') {
                skip_text_field(&mut lines);
                continue;
            }

            if line.eq_ignore_ascii_case("loop_") {
                let mut cif_loop = CifLoop::default();
                while let Some(next) = lines.peek() {
                    if next.starts_with('_') {
                        cif_loop.headers.push(next.to_lowercase());
                        lines.next();
                    } else {
                        break;
                    }
                }
                if cif_loop.headers.is_empty() {
                    return Err(StructureError::MalformedLoop("loop has no headers".into()));
                }

                let mut values: Vec<String> = Vec::new();
                while let Some(next) = lines.peek() {
                    if next.is_empty()
                        || next.starts_with('_')
                        || next.starts_with('#')
                        || next.starts_with("data_")
                        || next.eq_ignore_ascii_case("loop_")
                    {
                        break;
                    }
                    values.extend(tokenize(next));
                    lines.next();
                }

                let width = cif_loop.headers.len();
                if values.len() % width != 0 {
                    return Err(StructureError::MalformedLoop(format!(
                        "{} values do not fill rows of {} columns ({})",
                        values.len(),
                        width,
                        cif_loop.headers[0]
                    )));
                }
                cif_loop.rows = values.chunks(width).map(<[String]>::to_vec).collect();
                block.loops.push(cif_loop);
                continue;
            }

            if line.starts_with('_') {
                let mut tokens = tokenize(line).into_iter();
                let Some(tag) = tokens.next() else {
                    continue;
                };
                let value = match tokens.next() {
                    Some(value) => value,
                    None => match lines.peek() {
                        Some(next) if next.starts_with(';') => {
                            lines.next();
                            skip_text_field(&mut lines);
                            continue;
                        }
                        Some(next) if !next.starts_with('_') => {
                            let value = tokenize(next).into_iter().next().unwrap_or_default();
                            lines.next();
                            value
                        }
                        _ => continue,
                    },
                };
                block.tags.insert(tag.to_lowercase(), value);
            }
        }

        Ok(block)
    }

    fn number(&self, tag: &'static str) -> Result<f64, StructureError> {
        let raw = self.tags.get(tag).ok_or(StructureError::MissingTag(tag))?;
        match parse_cif_number(raw) {
            Some(Ok(value)) => Ok(value),
            Some(Err(())) => Err(StructureError::InvalidNumber {
                tag: tag.to_string(),
                value: raw.clone(),
            }),
            None => Err(StructureError::MissingTag(tag)),
        }
    }

    fn symmetry_operations(&self) -> Result<Vec<SymmetryOperation>, StructureError> {
        let found = self.loops.iter().find_map(|l| {
            SYMOP_TAGS
                .iter()
                .find_map(|tag| l.column(tag))
                .map(|col| (l, col))
        });

        let Some((cif_loop, col)) = found else {
            return Ok(vec![SymmetryOperation::identity()]);
        };

        let mut operations = cif_loop
            .rows
            .iter()
            .map(|row| SymmetryOperation::parse(&row[col]))
            .collect::<Result<Vec<_>, _>>()?;
        if operations.is_empty() {
            operations.push(SymmetryOperation::identity());
        }
        Ok(operations)
    }

    fn atom_sites(&self) -> Result<Vec<Site>, StructureError> {
        let cif_loop = self
            .loops
            .iter()
            .find(|l| l.column("_atom_site_fract_x").is_some())
            .ok_or(StructureError::NoSites)?;

        let required = |tag: &'static str| cif_loop.column(tag).ok_or(StructureError::MissingTag(tag));
        let x_col = required("_atom_site_fract_x")?;
        let y_col = required("_atom_site_fract_y")?;
        let z_col = required("_atom_site_fract_z")?;
        let symbol_col = cif_loop.column("_atom_site_type_symbol");
        let label_col = cif_loop.column("_atom_site_label");
        let occupancy_col = cif_loop.column("_atom_site_occupancy");
        if symbol_col.is_none() && label_col.is_none() {
            return Err(StructureError::MissingTag("_atom_site_type_symbol"));
        }

        let coordinate = |row: &[String], col: usize, tag: &str| -> Result<f64, StructureError> {
            match parse_cif_number(&row[col]) {
                Some(Ok(value)) => Ok(value),
                _ => Err(StructureError::InvalidNumber {
                    tag: tag.to_string(),
                    value: row[col].clone(),
                }),
            }
        };

        let mut sites = Vec::with_capacity(cif_loop.rows.len());
        for row in &cif_loop.rows {
            let element = match (symbol_col, label_col) {
                (Some(col), _) => Element::from_symbol(&row[col]),
                (None, Some(col)) => Element::from_symbol(&label_prefix(&row[col])),
                (None, None) => None,
            }
            .ok_or_else(|| {
                let source = symbol_col.or(label_col).map(|c| row[c].clone());
                StructureError::UnknownElement(source.unwrap_or_default())
            })?;

            let occupancy = match occupancy_col.map(|col| parse_cif_number(&row[col])) {
                Some(Some(Ok(value))) => value,
                Some(Some(Err(()))) => {
                    return Err(StructureError::InvalidNumber {
                        tag: "_atom_site_occupancy".to_string(),
                        value: occupancy_col.map(|c| row[c].clone()).unwrap_or_default(),
                    });
                }
                _ => 1.0,
            };

            sites.push(Site {
                element,
                fractional: Vector3::new(
                    coordinate(row, x_col, "_atom_site_fract_x")?,
                    coordinate(row, y_col, "_atom_site_fract_y")?,
                    coordinate(row, z_col, "_atom_site_fract_z")?,
                ),
                occupancy,
            });
        }

        if sites.is_empty() {
            return Err(StructureError::NoSites);
        }
        Ok(sites)
    }
}

fn skip_text_field<'a>(lines: &mut impl Iterator<Item = &'a str>) {
    for line in lines.by_ref() {
        if line.starts_with(';') {
            break;
        }
    }
}

/// Element part of a site label such as `Fe1` or `O12a`.
fn label_prefix(label: &str) -> String {
    let mut chars = label.chars();
    let mut prefix = String::new();
    if let Some(first) = chars.next().filter(char::is_ascii_uppercase) {
        prefix.push(first);
        if let Some(second) = chars.next().filter(char::is_ascii_lowercase) {
            prefix.push(second);
        }
    }
    prefix
}

/// Splits a CIF line into whitespace separated values, honoring single and double quotes.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }
        let mut token = String::new();
        if c == '\'' || c == '"' {
            chars.next();
            while let Some(next) = chars.next() {
                let closes = next == c && chars.peek().is_none_or(|after| after.is_whitespace());
                if closes {
                    break;
                }
                token.push(next);
            }
        } else {
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    break;
                }
                token.push(next);
                chars.next();
            }
        }
        tokens.push(token);
    }
    tokens
}
