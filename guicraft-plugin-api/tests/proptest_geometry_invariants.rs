//! Property-based invariant tests for sizing rules and config coercion.
//!
//! Verifies:
//! 1. `clamp_minimum` reaches the minimum and never shrinks a dimension.
//! 2. `clamp_minimum` never moves the rectangle.
//! 3. The curried validator agrees with `clamp_minimum`.
//! 4. Bounded number coercion always lands inside the bounds.
//! 5. Choice coercion accepts exactly the option ids.

use guicraft_plugin_api::{
    clamp_minimum, minimum_size_validator, ChoiceOption, ConfigFieldSpec, ConfigValue, Rect,
    SizeRule,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (-1000i64..=1000, -1000i64..=1000, -100i64..=1000, -100i64..=1000)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

const OPTIONS: [&str; 3] = ["plain", "dark", "light"];

// ═════════════════════════════════════════════════════════════════════════
// 1. Minimum reached, nothing shrunk
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clamp_reaches_minimum(rect in rect_strategy(), min_w in 0i64..200, min_h in 0i64..200) {
        let clamped = clamp_minimum(min_w, min_h, rect);
        prop_assert!(clamped.width >= min_w);
        prop_assert!(clamped.height >= min_h);
        prop_assert!(clamped.width >= rect.width);
        prop_assert!(clamped.height >= rect.height);
        if rect.width >= min_w {
            prop_assert_eq!(clamped.width, rect.width);
        }
        if rect.height >= min_h {
            prop_assert_eq!(clamped.height, rect.height);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Position is untouched
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clamp_keeps_position(rect in rect_strategy(), min_w in 0i64..200, min_h in 0i64..200) {
        let clamped = clamp_minimum(min_w, min_h, rect);
        prop_assert_eq!((clamped.x, clamped.y), (rect.x, rect.y));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Curried and rule forms agree
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn validator_forms_agree(rect in rect_strategy(), min_w in 0i64..200, min_h in 0i64..200) {
        let expected = clamp_minimum(min_w, min_h, rect);
        let curried = minimum_size_validator(min_w, min_h);
        prop_assert_eq!(curried(rect).unwrap(), expected);
        let rule = SizeRule::Minimum { width: min_w, height: min_h };
        prop_assert_eq!(rule.apply(rect).unwrap(), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Bounded numbers stay in range
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bounded_coercion_in_range(
        min in -1e6f64..1e6,
        span in 0f64..1e6,
        value in proptest::num::f64::NORMAL | proptest::num::f64::ZERO,
    ) {
        let max = min + span;
        let spec = ConfigFieldSpec::bounded(min, max).unwrap();
        let ConfigValue::Number(n) = spec.coerce(ConfigValue::Number(value)).unwrap() else {
            panic!("bounded field produced a non-number");
        };
        prop_assert!(n >= min && n <= max);
        if value >= min && value <= max {
            prop_assert_eq!(n, value);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Choices accept exactly their ids
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn choice_coercion_matches_options(choice in "[a-z]{1,6}", radio in any::<bool>()) {
        let options = OPTIONS.iter().map(|id| ChoiceOption::new(*id)).collect();
        let spec = if radio {
            ConfigFieldSpec::radio(options)
        } else {
            ConfigFieldSpec::dropdown(options)
        };
        let result = spec.coerce(ConfigValue::String(choice.clone()));
        prop_assert_eq!(result.is_ok(), OPTIONS.contains(&choice.as_str()));
        prop_assert!(spec.coerce(ConfigValue::Number(1.0)).is_err());
    }
}
