use crate::error::{GlowError, GlowResult};

/// Scales `field` in place so its maximum becomes exactly 1.0.
pub fn normalize_by_max(field: &mut [f32]) -> GlowResult<()> {
    let max = field_max(field);
    if !max.is_finite() || max <= 0.0 {
        return Err(GlowError::DegenerateField { max });
    }
    for value in field.iter_mut() {
        *value /= max;
    }
    Ok(())
}

/// Plateau compositing: the foreground is suppressed, the rest normalized by
/// its own maximum, then the foreground is pinned to exactly 1.0.
///
/// When the foreground covers every voxel there is nothing left to
/// normalize and the result is the plateau alone.
pub fn composite_mesa(field: &mut [f32], foreground: &[bool]) -> GlowResult<()> {
    if field.len() != foreground.len() {
        return Err(GlowError::invalid_input(format!(
            "glow field has {} voxels but the label mask has {}",
            field.len(),
            foreground.len()
        )));
    }
    for (value, &inside) in field.iter_mut().zip(foreground) {
        if inside {
            *value = 0.0;
        }
    }

    let exterior = foreground.iter().any(|inside| !inside);
    if exterior {
        normalize_by_max(field)?;
    }

    pin_foreground(field, foreground);
    Ok(())
}

pub fn pin_foreground(field: &mut [f32], foreground: &[bool]) {
    for (value, &inside) in field.iter_mut().zip(foreground) {
        if inside {
            *value = 1.0;
        }
    }
}

fn field_max(field: &[f32]) -> f32 {
    let mut max = 0.0f32;
    for &value in field {
        if value.is_nan() {
            return f32::NAN;
        }
        max = max.max(value);
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_maps_max_to_one() {
        let mut field = vec![0.5, 2.0, 1.0, 0.0];
        normalize_by_max(&mut field).expect("normalize");
        assert_eq!(field, vec![0.25, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn zero_field_is_degenerate() {
        let mut field = vec![0.0; 8];
        let err = normalize_by_max(&mut field).unwrap_err();
        assert!(matches!(err, GlowError::DegenerateField { max } if max == 0.0));
        assert!(field.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn non_finite_field_is_degenerate() {
        let mut field = vec![1.0, f32::NAN];
        assert!(matches!(
            normalize_by_max(&mut field),
            Err(GlowError::DegenerateField { .. })
        ));
        let mut field = vec![1.0, f32::INFINITY];
        assert!(matches!(
            normalize_by_max(&mut field),
            Err(GlowError::DegenerateField { .. })
        ));
    }

    #[test]
    fn mesa_pins_foreground_and_rescales_exterior() {
        let mut field = vec![4.0, 3.0, 2.0, 1.0];
        let foreground = [true, false, false, false];
        composite_mesa(&mut field, &foreground).expect("mesa");
        assert_eq!(field[0], 1.0);
        // The exterior is normalized by its own maximum (3.0), not the
        // suppressed interior value.
        assert_eq!(field[1], 1.0);
        assert!((field[2] - 2.0 / 3.0).abs() < 1.0e-7);
        assert!((field[3] - 1.0 / 3.0).abs() < 1.0e-7);
    }

    #[test]
    fn mesa_with_full_foreground_is_flat() {
        let mut field = vec![0.3; 4];
        composite_mesa(&mut field, &[true; 4]).expect("mesa");
        assert!(field.iter().all(|v| *v == 1.0));
    }

    #[test]
    fn mesa_rejects_mask_length_mismatch() {
        let mut field = vec![0.3; 4];
        assert!(matches!(
            composite_mesa(&mut field, &[true; 3]),
            Err(GlowError::InvalidInput(_))
        ));
    }
}
