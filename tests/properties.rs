use proptest::prelude::*;

use rusty_hands::config::InteractionConfig;
use rusty_hands::interaction::InteractionDetector;
use rusty_hands::types::{
    landmarks::INDEX_FINGER_TIP, GestureClassification, Hand, HandDetection, HitRegion, Landmark, RecognitionResult,
    Rect, HAND_LANDMARKS,
};

const CONTAINER: Rect = Rect {
    left: 0.0,
    top: 0.0,
    right: 640.0,
    bottom: 480.0,
};

#[derive(Debug, Clone)]
struct Tick {
    dt_ms: u64,
    trigger: bool,
    inside: bool,
    depth: f32,
}

fn tick_strategy() -> impl Strategy<Value = Tick> {
    (0u64..250, any::<bool>(), prop::bool::weighted(0.8), -0.3f32..0.3).prop_map(|(dt_ms, trigger, inside, depth)| Tick {
        dt_ms,
        trigger,
        inside,
        depth,
    })
}

fn result_for(tick: &Tick) -> RecognitionResult {
    // Mirrored: x=0.5 lands mid-screen, x=0.95 far left.
    let x = if tick.inside { 0.5 } else { 0.95 };
    let mut points = vec![Landmark::new(x, 0.5, 0.0); HAND_LANDMARKS];
    points[INDEX_FINGER_TIP] = Landmark::new(x, 0.42, tick.depth);
    let gesture = if tick.trigger { "Pointing_Up" } else { "Closed_Fist" };
    RecognitionResult::from_detections(
        vec![HandDetection {
            hand: Hand::new(points),
            gestures: vec![GestureClassification::new(gesture, 0.8)],
        }],
        2,
    )
}

/// Run the detector over `ticks`, returning (timestamp, fired) per tick.
fn simulate(ticks: &[Tick]) -> Vec<(u64, bool)> {
    let regions = vec![HitRegion::new("R1", Rect::new(220.0, 160.0, 420.0, 240.0))];
    let mut detector = InteractionDetector::new(InteractionConfig::default());
    let mut now = 1_000;
    ticks
        .iter()
        .map(|tick| {
            now += tick.dt_ms;
            let fired = detector.update(&result_for(tick), &CONTAINER, &regions, now).is_some();
            (now, fired)
        })
        .collect()
}

fn detection_strategy() -> impl Strategy<Value = HandDetection> {
    prop::collection::vec(0.0f32..1.0, 0..5).prop_map(|scores| HandDetection {
        hand: Hand::new(vec![Landmark::default(); HAND_LANDMARKS]),
        gestures: scores
            .into_iter()
            .enumerate()
            .map(|(i, s)| GestureClassification::new(format!("g{i}"), s))
            .collect(),
    })
}

proptest! {
    #[test]
    fn presses_respect_cooldown(ticks in prop::collection::vec(tick_strategy(), 1..200)) {
        let fires: Vec<u64> = simulate(&ticks).into_iter().filter(|(_, f)| *f).map(|(t, _)| t).collect();
        for pair in fires.windows(2) {
            prop_assert!(pair[1] - pair[0] >= 400, "fired at {} and {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn no_press_right_after_gesture_loss(ticks in prop::collection::vec(tick_strategy(), 2..200)) {
        let outcome = simulate(&ticks);
        for i in 1..ticks.len() {
            if !ticks[i - 1].trigger {
                prop_assert!(!outcome[i].1, "fired on tick {} after a non-trigger tick", i);
            }
        }
    }

    #[test]
    fn hands_and_gestures_stay_paired(detections in prop::collection::vec(detection_strategy(), 0..6)) {
        let result = RecognitionResult::from_detections(detections, 2);
        prop_assert!(result.hands().len() <= 2);
        prop_assert_eq!(result.hands().len(), result.gestures().len());
        for list in result.gestures() {
            for pair in list.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
