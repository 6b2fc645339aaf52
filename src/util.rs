use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn short_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_owned();
    }

    let mut trimmed = label
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    trimmed.push('…');
    trimmed
}

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_pair_is_bounded_and_repeatable() {
        for key in ["svc/payments/api", "pod/payments/api-7f9c", ""] {
            let (x, y) = stable_pair(key);
            assert!((-1.0..=1.0).contains(&x));
            assert!((-1.0..=1.0).contains(&y));
            assert_eq!(stable_pair(key), (x, y));
        }
    }

    #[test]
    fn short_label_keeps_short_names() {
        assert_eq!(short_label("checkout", 12), "checkout");
        assert_eq!(short_label("checkout-gateway-v2", 8), "checkou…");
    }
}
