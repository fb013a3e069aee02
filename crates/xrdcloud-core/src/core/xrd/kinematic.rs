use super::form_factor::{approximate, form_factor_vector};
use super::simulator::{DiffractionSimulator, SimulationError};
use super::wavelength::Wavelength;
use crate::core::crystal::lattice::{Lattice, reciprocal_point};
use crate::core::crystal::structure::CrystalStructure;
use crate::core::models::pattern::{DiffractionPattern, Reflection};
use crate::core::models::sample::DEFAULT_POINT_BUDGET;
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;
use tracing::{debug, trace};

pub const DEFAULT_INTENSITY_FLOOR: f64 = 1e-3;

/// Largest Miller index searched along any axis.
pub const MAX_MILLER_INDEX: i32 = 1024;
/// Largest number of lattice points one search box may hold.
pub const MAX_SEARCH_POINTS: u64 = 1 << 25;

const WIDENING_FACTOR: f64 = 1.25;
const MAX_WIDENING_STEPS: usize = 32;
// |F|² below this fraction of (Σf)² counts as a systematic extinction.
const EXTINCTION_TOLERANCE: f64 = 1e-10;

/// Reference simulator based on kinematic scattering.
///
/// Every reciprocal lattice point inside the limiting sphere `|G| ≤ 2/λ` is a candidate
/// reflection. Intensities are `|F|²` times the Lorentz-polarization factor
/// `(1 + cos²2θ) / (sin²θ · cosθ)`. Reflections weaker than `intensity_floor` times the
/// strongest one are dropped, and at most `max_reflections` of the most intense survive.
///
/// When fewer than `max_reflections` survive, the search widens past the limiting sphere
/// in steps until the shortfall can be filled. Points outside the sphere have no Bragg
/// angle, so their intensity is the bare `|F|²`; systematic extinctions are left out and
/// the floor does not apply to them. Every reflection inside the sphere is kept and the
/// strongest outer points fill the remaining slots. Nothing is widened without a cap, or
/// when no reflection lies inside the sphere at all.
///
/// Surviving reflections keep hkl enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicSimulator {
    max_reflections: Option<usize>,
    intensity_floor: f64,
}

impl Default for KinematicSimulator {
    fn default() -> Self {
        Self {
            max_reflections: Some(DEFAULT_POINT_BUDGET),
            intensity_floor: DEFAULT_INTENSITY_FLOOR,
        }
    }
}

struct Candidate {
    hkl: [i32; 3],
    position: Vector3<f64>,
    intensity: f64,
    s: f64,
}

impl KinematicSimulator {
    pub fn new(max_reflections: Option<usize>, intensity_floor: f64) -> Self {
        Self {
            max_reflections,
            intensity_floor: intensity_floor.max(0.0),
        }
    }

    pub fn max_reflections(&self) -> Option<usize> {
        self.max_reflections
    }

    pub fn intensity_floor(&self) -> f64 {
        self.intensity_floor
    }

    /// `|F|²` and the summed scattering power `Σ occ·f` at `s = sinθ/λ`.
    fn structure_factor(structure: &CrystalStructure, hkl: [i32; 3], s: f64) -> (f64, f64) {
        let h = Vector3::new(hkl[0] as f64, hkl[1] as f64, hkl[2] as f64);
        let (re, im, total) =
            structure
                .sites()
                .iter()
                .fold((0.0, 0.0, 0.0), |(re, im, total), site| {
                    let f = site.occupancy * approximate(site.element, s);
                    let phase = 2.0 * PI * h.dot(&site.fractional);
                    (re + f * phase.cos(), im + f * phase.sin(), total + f)
                });
        (re * re + im * im, total)
    }

    /// Reflections past the limiting sphere, the strongest `missing` of them.
    fn widen(
        structure: &CrystalStructure,
        reciprocal: &Matrix3<f64>,
        g_max: f64,
        missing: usize,
    ) -> Vec<Candidate> {
        let lattice = structure.lattice();
        let mut radius = g_max;
        let mut outer = Vec::new();

        for _ in 0..MAX_WIDENING_STEPS {
            let next = radius * WIDENING_FACTOR;
            let Ok(bounds) = search_bounds(lattice, next) else {
                break;
            };
            radius = next;
            outer.clear();
            for_each_point(bounds, |hkl| {
                let position = reciprocal_point(reciprocal, hkl);
                let g = position.norm();
                if g <= g_max || g > radius {
                    return;
                }
                let s = g / 2.0;
                let (intensity, total) = Self::structure_factor(structure, hkl, s);
                if intensity <= EXTINCTION_TOLERANCE * total * total {
                    return;
                }
                outer.push(Candidate {
                    hkl,
                    position,
                    intensity,
                    s,
                });
            });
            if outer.len() >= missing {
                break;
            }
        }

        if outer.len() < missing {
            debug!(
                found = outer.len(),
                missing, "Search box limit reached before the reflection cap was filled."
            );
        }
        keep_strongest(&mut outer, missing);
        trace!(radius, added = outer.len(), "Widened reflection search.");
        outer
    }
}

/// Per-axis Miller index bounds of the box holding every `|G| ≤ radius`.
///
/// `h = G · a`, so `|h| ≤ |G|·|a|` along each axis.
fn search_bounds(lattice: &Lattice, radius: f64) -> Result<[i32; 3], SimulationError> {
    let mut bounds = [0_i32; 3];
    let mut points: u64 = 1;
    for (i, bound) in bounds.iter_mut().enumerate() {
        let extent = (radius * lattice.vector(i).norm()).ceil();
        if !(extent.is_finite() && extent <= MAX_MILLER_INDEX as f64) {
            return Err(SimulationError::Record(format!(
                "reflection search needs Miller indices up to {extent}, limit is {MAX_MILLER_INDEX}"
            )));
        }
        *bound = extent as i32;
        points = points.saturating_mul(2 * extent as u64 + 1);
    }
    if points > MAX_SEARCH_POINTS {
        return Err(SimulationError::Record(format!(
            "reflection search box holds {points} lattice points, limit is {MAX_SEARCH_POINTS}"
        )));
    }
    Ok(bounds)
}

/// Visits every hkl of the box except the origin, in lexicographic order.
fn for_each_point(bounds: [i32; 3], mut visit: impl FnMut([i32; 3])) {
    for h in -bounds[0]..=bounds[0] {
        for k in -bounds[1]..=bounds[1] {
            for l in -bounds[2]..=bounds[2] {
                if h != 0 || k != 0 || l != 0 {
                    visit([h, k, l]);
                }
            }
        }
    }
}

/// Drops all but the `keep` most intense candidates without reordering the rest.
fn keep_strongest(candidates: &mut Vec<Candidate>, keep: usize) {
    if candidates.len() <= keep {
        return;
    }
    let mut ranked: Vec<usize> = (0..candidates.len()).collect();
    ranked.sort_by(|&a, &b| candidates[b].intensity.total_cmp(&candidates[a].intensity));
    let mut flags = vec![false; candidates.len()];
    for &index in ranked.iter().take(keep) {
        flags[index] = true;
    }
    let mut flags = flags.into_iter();
    candidates.retain(|_| flags.next().unwrap_or(false));
}

impl DiffractionSimulator for KinematicSimulator {
    fn simulate(
        &self,
        structure: &CrystalStructure,
        wavelength: Wavelength,
    ) -> Result<DiffractionPattern, SimulationError> {
        let lambda = wavelength.value();
        if !(lambda.is_finite() && lambda > 0.0) {
            return Err(SimulationError::Record(format!(
                "invalid wavelength {lambda}"
            )));
        }

        let lattice = structure.lattice();
        let reciprocal = lattice.reciprocal_crystallographic();
        let g_max = 2.0 / lambda;
        let bounds = search_bounds(lattice, g_max)?;

        let mut candidates = Vec::new();
        for_each_point(bounds, |hkl| {
            let position = reciprocal_point(&reciprocal, hkl);
            let g = position.norm();
            if g > g_max {
                return;
            }

            let sin_theta = (g * lambda / 2.0).min(1.0);
            let theta = sin_theta.asin();
            let cos_theta = theta.cos();
            if cos_theta < 1e-8 {
                return;
            }
            let cos_two_theta = (2.0 * theta).cos();
            let lorentz_polarization =
                (1.0 + cos_two_theta * cos_two_theta) / (sin_theta * sin_theta * cos_theta);

            let s = g / 2.0;
            let (f_sq, _) = Self::structure_factor(structure, hkl, s);
            candidates.push(Candidate {
                hkl,
                position,
                intensity: f_sq * lorentz_polarization,
                s,
            });
        });

        let strongest = candidates
            .iter()
            .map(|c| c.intensity)
            .fold(0.0_f64, f64::max);
        if !(strongest > 0.0) {
            return Err(SimulationError::Record(
                "no reflections inside the limiting sphere".to_string(),
            ));
        }

        let threshold = self.intensity_floor * strongest;
        candidates.retain(|c| c.intensity >= threshold && c.intensity > 0.0);

        if let Some(cap) = self.max_reflections {
            if candidates.len() > cap {
                keep_strongest(&mut candidates, cap);
            } else if candidates.len() < cap {
                let missing = cap - candidates.len();
                candidates.extend(Self::widen(structure, &reciprocal, g_max, missing));
                candidates.sort_by_key(|c| c.hkl);
            }
        }

        let elements = structure.elements();
        let reflections: Vec<Reflection> = candidates
            .into_iter()
            .map(|c| {
                Reflection::new(
                    c.hkl,
                    c.position,
                    c.intensity,
                    form_factor_vector(&elements, c.s),
                )
            })
            .collect();

        trace!(
            reflections = reflections.len(),
            wavelength = lambda,
            "Kinematic pattern simulated."
        );
        Ok(DiffractionPattern::new(reciprocal, reflections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crystal::lattice::Lattice;
    use crate::core::crystal::structure::Site;
    use crate::core::models::element::{ELEMENT_COUNT, Element};

    fn site(symbol: &str, x: f64, y: f64, z: f64) -> Site {
        Site {
            element: Element::from_symbol(symbol).unwrap(),
            fractional: Vector3::new(x, y, z),
            occupancy: 1.0,
        }
    }

    fn bcc_iron() -> CrystalStructure {
        let lattice = Lattice::from_parameters(2.8665, 2.8665, 2.8665, 90.0, 90.0, 90.0).unwrap();
        CrystalStructure::new(
            lattice,
            vec![site("Fe", 0.0, 0.0, 0.0), site("Fe", 0.5, 0.5, 0.5)],
        )
        .unwrap()
    }

    fn rock_salt() -> CrystalStructure {
        let lattice = Lattice::from_parameters(5.6917, 5.6917, 5.6917, 90.0, 90.0, 90.0).unwrap();
        let mut sites = Vec::new();
        for [x, y, z] in [[0.0, 0.0, 0.0], [0.0, 0.5, 0.5], [0.5, 0.0, 0.5], [0.5, 0.5, 0.0]] {
            sites.push(site("Na", x, y, z));
            sites.push(site("Cl", (x + 0.5) % 1.0, y, z));
        }
        CrystalStructure::new(lattice, sites).unwrap()
    }

    #[test]
    fn body_centred_extinctions_are_removed() {
        let pattern = KinematicSimulator::default()
            .simulate(&bcc_iron(), Wavelength::default())
            .unwrap();
        assert!(!pattern.is_empty());
        for reflection in &pattern.reflections {
            let sum: i32 = reflection.hkl.iter().sum();
            assert_eq!(sum.rem_euclid(2), 0, "{:?} should be extinct", reflection.hkl);
        }
    }

    #[test]
    fn uncapped_reflections_stay_inside_limiting_sphere() {
        let wavelength = Wavelength::default();
        let pattern = KinematicSimulator::new(None, DEFAULT_INTENSITY_FLOOR)
            .simulate(&rock_salt(), wavelength)
            .unwrap();
        let g_max = 2.0 / wavelength.value();
        for reflection in &pattern.reflections {
            assert!(reflection.spherical_position.radius <= g_max + 1e-12);
            assert!(reflection.intensity > 0.0);
            assert_eq!(reflection.atomic_form_factor.len(), ELEMENT_COUNT);
            let present = reflection
                .atomic_form_factor
                .iter()
                .filter(|f| **f > 0.0)
                .count();
            assert_eq!(present, 2);
        }
    }

    #[test]
    fn reflection_cap_keeps_the_most_intense() {
        let full = KinematicSimulator::new(None, 0.0)
            .simulate(&rock_salt(), Wavelength::default())
            .unwrap();
        let capped = KinematicSimulator::new(Some(10), 0.0)
            .simulate(&rock_salt(), Wavelength::default())
            .unwrap();
        assert_eq!(capped.len(), 10);

        let mut intensities: Vec<f64> = full.reflections.iter().map(|r| r.intensity).collect();
        intensities.sort_by(|a, b| b.total_cmp(a));
        let tenth = intensities[9];
        assert!(capped.reflections.iter().all(|r| r.intensity >= tenth));
    }

    #[test]
    fn pattern_carries_reciprocal_basis() {
        let structure = bcc_iron();
        let pattern = KinematicSimulator::default()
            .simulate(&structure, Wavelength::default())
            .unwrap();
        assert_eq!(
            pattern.reciprocal_lattice,
            structure.lattice().reciprocal_crystallographic()
        );
    }

    #[test]
    fn long_wavelength_leaves_no_reflections() {
        let tiny = CrystalStructure::new(
            Lattice::from_parameters(1.0, 1.0, 1.0, 90.0, 90.0, 90.0).unwrap(),
            vec![site("H", 0.0, 0.0, 0.0)],
        )
        .unwrap();
        let result = KinematicSimulator::default().simulate(&tiny, Wavelength::Angstrom(10.0));
        assert!(matches!(result, Err(SimulationError::Record(_))));
    }

    #[test]
    fn small_cells_are_widened_up_to_the_cap() {
        let wavelength = Wavelength::default();
        let g_max = 2.0 / wavelength.value();
        let inside = KinematicSimulator::new(None, DEFAULT_INTENSITY_FLOOR)
            .simulate(&bcc_iron(), wavelength)
            .unwrap();
        assert!(inside.len() < DEFAULT_POINT_BUDGET);

        let widened = KinematicSimulator::default()
            .simulate(&bcc_iron(), wavelength)
            .unwrap();
        assert_eq!(widened.len(), DEFAULT_POINT_BUDGET);

        let hkls: Vec<[i32; 3]> = widened.reflections.iter().map(|r| r.hkl).collect();
        assert!(hkls.windows(2).all(|w| w[0] < w[1]));
        for reflection in &inside.reflections {
            assert!(hkls.contains(&reflection.hkl));
        }
        let outer = widened
            .reflections
            .iter()
            .filter(|r| r.spherical_position.radius > g_max)
            .count();
        assert_eq!(outer, DEFAULT_POINT_BUDGET - inside.len());
    }

    #[test]
    fn widening_fills_any_cap_for_cubic_metals() {
        let copper = CrystalStructure::new(
            Lattice::from_parameters(3.61, 3.61, 3.61, 90.0, 90.0, 90.0).unwrap(),
            vec![
                site("Cu", 0.0, 0.0, 0.0),
                site("Cu", 0.0, 0.5, 0.5),
                site("Cu", 0.5, 0.0, 0.5),
                site("Cu", 0.5, 0.5, 0.0),
            ],
        )
        .unwrap();
        for cap in [64, 512, 1000] {
            let pattern = KinematicSimulator::new(Some(cap), DEFAULT_INTENSITY_FLOOR)
                .simulate(&copper, Wavelength::default())
                .unwrap();
            assert_eq!(pattern.len(), cap);
            for reflection in &pattern.reflections {
                let [h, k, l] = reflection.hkl.map(|i| i.rem_euclid(2));
                assert!(h == k && k == l, "{:?} should be extinct", reflection.hkl);
            }
        }
    }

    #[test]
    fn absurd_cells_are_rejected_before_searching() {
        for length in [1.0e6, 300.0] {
            let huge = CrystalStructure::new(
                Lattice::from_parameters(length, length, length, 90.0, 90.0, 90.0).unwrap(),
                vec![site("Fe", 0.0, 0.0, 0.0)],
            )
            .unwrap();
            let result = KinematicSimulator::default().simulate(&huge, Wavelength::default());
            assert!(matches!(result, Err(SimulationError::Record(_))), "a = {length}");
        }
    }
}
