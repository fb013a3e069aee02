#![allow(dead_code)]

use nalgebra::Vector3;
use std::path::{Path, PathBuf};
use xrdcloud::core::crystal::structure::CrystalStructure;
use xrdcloud::core::models::element::ELEMENT_COUNT;
use xrdcloud::core::models::pattern::{DiffractionPattern, Reflection};
use xrdcloud::core::xrd::simulator::{DiffractionSimulator, SimulationError};
use xrdcloud::core::xrd::wavelength::Wavelength;

/// Deterministic stand-in for a diffraction library.
///
/// Emits `points` reflections whose positions scale with the cell length. Structures
/// containing hydrogen get one reflection too few, structures containing helium make the
/// backend fail.
pub struct FakeSimulator {
    pub points: usize,
}

impl DiffractionSimulator for FakeSimulator {
    fn simulate(
        &self,
        structure: &CrystalStructure,
        _wavelength: Wavelength,
    ) -> Result<DiffractionPattern, SimulationError> {
        let elements = structure.elements();
        if elements.iter().any(|e| e.symbol() == "He") {
            return Err(SimulationError::Backend("license server unreachable".into()));
        }
        let count = if elements.iter().any(|e| e.symbol() == "H") {
            self.points - 1
        } else {
            self.points
        };

        let a = structure.lattice().vector(0).norm();
        let reciprocal = structure.lattice().reciprocal_crystallographic();
        let reflections = (0..count)
            .map(|i| {
                let t = i as f64;
                let position = Vector3::new(0.01 * (t + 1.0) / a, 0.5 - 0.001 * t, 0.3 + 0.0005 * t);
                let mut aff = vec![0.0; ELEMENT_COUNT];
                for element in &elements {
                    aff[element.index()] =
                        element.atomic_number() as f64 * (1.0 - 0.5 * t / self.points as f64);
                }
                Reflection::new([i as i32, 1, 0], position, 1000.0 / (t + 1.0), aff)
            })
            .collect();
        Ok(DiffractionPattern::new(reciprocal, reflections))
    }
}

pub fn cif(element: &str, a: f64) -> String {
    format!(
        "data_{element}\n\
         _cell_length_a {a}\n\
         _cell_length_b {a}\n\
         _cell_length_c {a}\n\
         _cell_angle_alpha 90\n\
         _cell_angle_beta 90\n\
         _cell_angle_gamma 90\n\
         loop_\n\
         _atom_site_type_symbol\n\
         _atom_site_fract_x\n\
         _atom_site_fract_y\n\
         _atom_site_fract_z\n\
         {element} 0 0 0\n\
         {element} 0.5 0.5 0.5\n"
    )
}

pub struct CatalogRow<'a> {
    pub id: &'a str,
    pub structure: String,
    pub band_gap: f64,
}

pub fn row<'a>(id: &'a str, element: &str, a: f64, band_gap: f64) -> CatalogRow<'a> {
    CatalogRow {
        id,
        structure: cif(element, a),
        band_gap,
    }
}

/// Writes a `;`-delimited catalog with the default column names.
pub fn write_catalog(dir: &Path, rows: &[CatalogRow]) -> PathBuf {
    let path = dir.join("catalog.csv");
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(&path)
        .unwrap();
    writer
        .write_record([
            "material_id",
            "cif",
            "band_gap",
            "energy_per_atom",
            "formation_energy_per_atom",
        ])
        .unwrap();
    for (i, row) in rows.iter().enumerate() {
        writer
            .write_record([
                row.id.to_string(),
                row.structure.clone(),
                row.band_gap.to_string(),
                (-4.0 - i as f64 * 0.25).to_string(),
                (-1.0 + i as f64 * 0.125).to_string(),
            ])
            .unwrap();
    }
    writer.flush().unwrap();
    path
}

pub fn sorted_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
