//! Descriptor comparison
//!
//! Descriptors are 128-component vectors produced by the browser-side face
//! pipeline. Closeness in Euclidean distance means identity similarity.

use sams_common::db::DESCRIPTOR_LEN;
use thiserror::Error;

/// Distance reported for inputs that cannot be compared
///
/// Larger than any real threshold, so a matcher can never select it.
pub const UNBOUNDED_DISTANCE: f64 = f64::INFINITY;

/// Descriptor shape errors, raised at the boundary before matching
#[derive(Debug, Error, PartialEq)]
pub enum DescriptorError {
    #[error("Descriptor must have exactly {expected} components, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Descriptor component {index} is not a finite number")]
    NonFinite { index: usize },
}

/// Euclidean distance between two descriptors
///
/// Returns [`UNBOUNDED_DISTANCE`] if either side is not exactly
/// [`DESCRIPTOR_LEN`] long (an empty slice stands in for a missing descriptor).
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != DESCRIPTOR_LEN || b.len() != DESCRIPTOR_LEN {
        return UNBOUNDED_DISTANCE;
    }

    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Check a descriptor is storable / matchable
pub fn validate_descriptor(values: &[f64]) -> Result<(), DescriptorError> {
    if values.len() != DESCRIPTOR_LEN {
        return Err(DescriptorError::WrongLength {
            expected: DESCRIPTOR_LEN,
            actual: values.len(),
        });
    }

    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(DescriptorError::NonFinite { index });
    }

    Ok(())
}

/// Convert a JSON value into a descriptor
///
/// Accepts only an array of exactly 128 finite numbers.
pub fn descriptor_from_json(value: &serde_json::Value) -> Result<Vec<f64>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| "faceDescriptor must be an array of numbers".to_string())?;

    let mut descriptor = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let number = item
            .as_f64()
            .ok_or_else(|| format!("faceDescriptor[{}] is not a number", index))?;
        descriptor.push(number);
    }

    validate_descriptor(&descriptor).map_err(|e| e.to_string())?;
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ramp(offset: f64) -> Vec<f64> {
        (0..DESCRIPTOR_LEN).map(|i| i as f64 * 0.01 + offset).collect()
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = ramp(0.0);
        assert_eq!(euclidean_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = ramp(0.0);
        let b: Vec<f64> = (0..DESCRIPTOR_LEN).map(|i| ((i * 7) % 13) as f64 * 0.1).collect();
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
    }

    #[test]
    fn test_unit_offset_distance_is_sqrt_128() {
        let a = ramp(0.0);
        let b = ramp(1.0);
        let d = euclidean_distance(&a, &b);
        assert!((d - (128.0f64).sqrt()).abs() < 1e-9, "got {}", d);
    }

    #[test]
    fn test_single_component_difference() {
        let a = vec![0.0; DESCRIPTOR_LEN];
        let mut b = a.clone();
        b[42] = 0.3;
        assert!((euclidean_distance(&a, &b) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_unbounded() {
        let a = ramp(0.0);
        assert_eq!(euclidean_distance(&a, &a[..127]), UNBOUNDED_DISTANCE);
        assert_eq!(euclidean_distance(&a[..10], &a[..10]), UNBOUNDED_DISTANCE);
        assert_eq!(euclidean_distance(&a, &[]), UNBOUNDED_DISTANCE);
        assert!(UNBOUNDED_DISTANCE > 1e300);
    }

    #[test]
    fn test_validate_descriptor() {
        assert!(validate_descriptor(&ramp(0.0)).is_ok());
        assert_eq!(
            validate_descriptor(&[0.0; 127]),
            Err(DescriptorError::WrongLength {
                expected: 128,
                actual: 127
            })
        );

        let mut bad = ramp(0.0);
        bad[5] = f64::NAN;
        assert_eq!(
            validate_descriptor(&bad),
            Err(DescriptorError::NonFinite { index: 5 })
        );
    }

    #[test]
    fn test_descriptor_from_json() {
        let ok = json!(ramp(0.5));
        assert_eq!(descriptor_from_json(&ok).unwrap().len(), DESCRIPTOR_LEN);

        let ints = json!(vec![1; DESCRIPTOR_LEN]);
        assert_eq!(descriptor_from_json(&ints).unwrap()[0], 1.0);

        assert!(descriptor_from_json(&json!("not an array")).is_err());
        assert!(descriptor_from_json(&json!([1.0, 2.0])).is_err());

        let mut mixed: Vec<serde_json::Value> = ramp(0.0).into_iter().map(|v| json!(v)).collect();
        mixed[3] = json!("x");
        let err = descriptor_from_json(&serde_json::Value::Array(mixed)).unwrap_err();
        assert!(err.contains("faceDescriptor[3]"));
    }
}
