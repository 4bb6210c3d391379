use pycbcc_bridge::LogLevel;
use proptest::prelude::*;

const KNOWN: [i64; 7] = [0, 5, 10, 20, 30, 40, 50];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn mapping_is_stable_for_any_code(code in any::<i64>()) {
        let level = LogLevel::from_external(code);
        prop_assert_eq!(LogLevel::from_external(level.to_external() as i64), level);
        if !KNOWN.contains(&code) {
            prop_assert_eq!(level, LogLevel::Off);
        }
    }
}

#[test]
fn known_codes_map_in_order() {
    let levels: Vec<_> = KNOWN.iter().map(|&c| LogLevel::from_external(c)).collect();
    assert_eq!(levels, LogLevel::ALL.to_vec());
    assert!(levels.windows(2).all(|w| w[0] < w[1]));
}
