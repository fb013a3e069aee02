use crate::core::models::element::{ELEMENT_COUNT, Element};

/// Coarse analytic atomic form factor `f(s) = Z·exp(-b·s²)` with `b = 10·Z^(-1/3)`.
///
/// `s` is `sin(θ)/λ` in Å⁻¹. At `s = 0` the value equals the electron count.
pub fn approximate(element: Element, s: f64) -> f64 {
    let z = element.atomic_number() as f64;
    let b = 10.0 / z.cbrt();
    z * (-b * s * s).exp()
}

/// Dense per-element vector for one reflection: the form factor of every element present
/// in the structure at its slot, zero elsewhere.
pub fn form_factor_vector(elements: &[Element], s: f64) -> Vec<f64> {
    let mut vector = vec![0.0; ELEMENT_COUNT];
    for element in elements {
        vector[element.index()] = approximate(*element, s);
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(symbol: &str) -> Element {
        Element::from_symbol(symbol).unwrap()
    }

    #[test]
    fn forward_scattering_equals_electron_count() {
        assert_eq!(approximate(el("Fe"), 0.0), 26.0);
        assert_eq!(approximate(el("H"), 0.0), 1.0);
    }

    #[test]
    fn decays_with_scattering_vector() {
        let fe = el("Fe");
        assert!(approximate(fe, 0.2) > approximate(fe, 0.5));
        assert!(approximate(fe, 0.5) > 0.0);
    }

    #[test]
    fn vector_fills_only_present_elements() {
        let vector = form_factor_vector(&[el("Na"), el("Cl")], 0.1);
        assert_eq!(vector.len(), ELEMENT_COUNT);
        assert!(vector[10] > 0.0);
        assert!(vector[16] > 0.0);
        assert_eq!(vector.iter().filter(|v| **v != 0.0).count(), 2);
    }
}
