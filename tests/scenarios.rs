//! End-to-end scheduling scenarios (spec §8).

use std::collections::HashMap;

use cgmath::Point2;

use posplan::calibration::{AxisCurrents, Calibration, CalibrationStore, Range};
use posplan::collide::{FixedBoundary, KeepoutGeometry};
use posplan::config::SchedulerConfig;
use posplan::geom::Polygon;
use posplan::schedule::{CollisionMode, Command, Request, Schedule};
use posplan::transform::PetalTransform;
use posplan::{AdmissionError, PosIntTP};

fn calib() -> Calibration {
    Calibration::new(
        3.0, 3.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0,
        Range::new(-200.0, 200.0),
        Range::new(-20.0, 200.0),
        Range::new(-180.0, 180.0),
        Range::new(-10.0, 180.0),
        true, 1, true, 3.0, 1, 1, false, 0.01, 0.02,
        AxisCurrents { spinupdown: 70.0, cruise: 70.0, creep: 100.0, hold: 0.0 },
        AxisCurrents { spinupdown: 70.0, cruise: 70.0, creep: 100.0, hold: 0.0 },
    )
    .unwrap()
}

fn square_geom(center: Point2<f64>) -> KeepoutGeometry {
    let square = |side: f64| {
        let h = side / 2.0;
        Polygon::new(vec![
            Point2::new(-h, -h),
            Point2::new(h, -h),
            Point2::new(h, h),
            Point2::new(-h, h),
        ])
    };
    KeepoutGeometry {
        keepout_t: square(1.0),
        keepout_p: square(1.0),
        ferrule_radius: 0.1,
        center,
    }
}

#[test]
fn single_positioner_direct_move_reaches_target() {
    let mut store = CalibrationStore::new();
    store.insert("M01", calib());
    let mut geoms = HashMap::new();
    geoms.insert("M01".to_string(), square_geom(Point2::new(0.0, 0.0)));

    let mut schedule = Schedule::new(
        &store,
        geoms,
        vec![],
        PetalTransform::identity(),
        SchedulerConfig::default(),
    );
    let req = Request::new(Command::PosIntTP, (30.0, 60.0), "single move");
    schedule
        .request_target("M01", PosIntTP { t: 0.0, p: 90.0 }, &req)
        .unwrap();

    let (tables, failures) = schedule.schedule_moves(CollisionMode::Adjust, &HashMap::new());
    assert!(failures.is_empty());
    let (dt, dp) = tables["M01"].for_cleanup();
    assert!((dt - 30.0).abs() < 1e-9);
    assert!((dp - (-30.0)).abs() < 1e-9);
}

#[test]
fn neighboring_positioners_produce_a_full_three_stage_plan_with_forced_recursive_freeze() {
    // Two close neighbors requesting opposing phi moves: whatever the
    // retract/rotate/extend stages find, `ForcedRecursive` guarantees the
    // cycle completes with a merged table per positioner rather than an
    // unresolved error (spec §4.4 "forced recursive freeze").
    let mut store = CalibrationStore::new();
    store.insert("A", calib());
    store.insert("B", calib());
    let mut geoms = HashMap::new();
    geoms.insert("A".to_string(), square_geom(Point2::new(0.0, 0.0)));
    geoms.insert("B".to_string(), square_geom(Point2::new(5.0, 0.0)));

    let mut schedule = Schedule::new(
        &store,
        geoms,
        vec![],
        PetalTransform::identity(),
        SchedulerConfig::default(),
    );
    schedule
        .request_target(
            "A",
            PosIntTP { t: 0.0, p: 0.0 },
            &Request::new(Command::PosIntTP, (0.0, 90.0), "extend toward B"),
        )
        .unwrap();
    schedule
        .request_target(
            "B",
            PosIntTP { t: 0.0, p: 180.0 },
            &Request::new(Command::PosIntTP, (0.0, 90.0), "extend toward A"),
        )
        .unwrap();

    let (tables, failures) = schedule.schedule_moves(CollisionMode::ForcedRecursive, &HashMap::new());
    assert!(failures.is_empty());
    assert!(!tables["A"].is_empty());
    assert!(!tables["B"].is_empty());
    // Three stages each contribute at least one row.
    assert!(tables["A"].len() >= 3);
    assert!(tables["B"].len() >= 3);
}

#[test]
fn unreachable_target_is_rejected_at_admission() {
    let mut store = CalibrationStore::new();
    store.insert("M01", calib());
    let mut geoms = HashMap::new();
    geoms.insert("M01".to_string(), square_geom(Point2::new(0.0, 0.0)));

    let mut schedule = Schedule::new(
        &store,
        geoms,
        vec![],
        PetalTransform::identity(),
        SchedulerConfig::default(),
    );
    let req = Request::new(Command::PtlXY, (500.0, 500.0), "out of annulus");
    let result = schedule.request_target("M01", PosIntTP { t: 0.0, p: 0.0 }, &req);
    assert_eq!(result, Err(AdmissionError::Unreachable("M01".to_string())));
}

#[test]
fn disabled_positioner_is_rejected_at_admission() {
    let mut store = CalibrationStore::new();
    store.insert("A", calib());
    let mut disabled = calib();
    disabled.ctrl_enabled = false;
    store.insert("B", disabled);

    let mut geoms = HashMap::new();
    geoms.insert("A".to_string(), square_geom(Point2::new(0.0, 0.0)));
    geoms.insert("B".to_string(), square_geom(Point2::new(5.0, 0.0)));

    let mut schedule = Schedule::new(
        &store,
        geoms,
        vec![],
        PetalTransform::identity(),
        SchedulerConfig::default(),
    );
    let req = Request::new(Command::PosIntTP, (0.0, 10.0), "small move");
    schedule
        .request_target("A", PosIntTP { t: 0.0, p: 0.0 }, &req)
        .unwrap();
    let result = schedule.request_target("B", PosIntTP { t: 0.0, p: 0.0 }, &req);
    assert_eq!(result, Err(AdmissionError::Disabled("B".to_string())));
}

#[test]
fn target_out_of_bounds_against_fixed_petal_edge_is_rejected() {
    let mut store = CalibrationStore::new();
    store.insert("M01", calib());
    let mut geoms = HashMap::new();
    geoms.insert("M01".to_string(), square_geom(Point2::new(0.0, 0.0)));

    let petal_edge = FixedBoundary {
        tag: "PTL",
        polygon: Polygon::new(vec![
            Point2::new(5.0, -50.0),
            Point2::new(50.0, -50.0),
            Point2::new(50.0, 50.0),
            Point2::new(5.0, 50.0),
        ]),
    };

    let mut schedule = Schedule::new(
        &store,
        geoms,
        vec![petal_edge],
        PetalTransform::identity(),
        SchedulerConfig::default(),
    );
    // theta=0, phi=90 places the ferrule at x = r1 (3.0), well clear of x=5;
    // phi=0 extends the ferrule fully to x = r1+r2 = 6.0, inside the boundary.
    let req = Request::new(Command::PosIntTP, (0.0, 0.0), "full extension toward petal edge");
    let result = schedule.request_target("M01", PosIntTP { t: 0.0, p: 90.0 }, &req);
    assert_eq!(
        result,
        Err(AdmissionError::OutOfBounds("M01".to_string(), "PTL"))
    );
}

#[test]
fn admission_time_neighbor_target_interference_is_rejected() {
    let mut store = CalibrationStore::new();
    store.insert("A", calib());
    store.insert("B", calib());
    let mut geoms = HashMap::new();
    geoms.insert("A".to_string(), square_geom(Point2::new(0.0, 0.0)));
    // B's center is placed so that, at the targets requested below, both
    // positioners' phi arms land on the exact same point (arm_origin),
    // guaranteeing a PhiPhi overlap.
    geoms.insert("B".to_string(), square_geom(Point2::new(6.0, 0.0)));

    let mut schedule = Schedule::new(
        &store,
        geoms,
        vec![],
        PetalTransform::identity(),
        SchedulerConfig::default(),
    );
    schedule
        .request_target(
            "A",
            PosIntTP { t: 0.0, p: 0.0 },
            &Request::new(Command::PosIntTP, (0.0, 0.0), "arm toward B"),
        )
        .unwrap();
    let result = schedule.request_target(
        "B",
        PosIntTP { t: 180.0, p: 0.0 },
        &Request::new(Command::PosIntTP, (180.0, 0.0), "arm toward A"),
    );
    assert_eq!(
        result,
        Err(AdmissionError::NeighborTargetInterference(
            "B".to_string(),
            "A".to_string()
        ))
    );
}

#[test]
fn power_anneal_staggers_shared_supply_group_start_times() {
    let mut store = CalibrationStore::new();
    store.insert("A", calib());
    store.insert("B", calib());
    store.insert("C", calib());
    let mut geoms = HashMap::new();
    geoms.insert("A".to_string(), square_geom(Point2::new(0.0, 0.0)));
    geoms.insert("B".to_string(), square_geom(Point2::new(100.0, 0.0)));
    geoms.insert("C".to_string(), square_geom(Point2::new(200.0, 0.0)));

    let mut schedule = Schedule::new(
        &store,
        geoms,
        vec![],
        PetalTransform::identity(),
        SchedulerConfig::default(),
    );
    for id in ["A", "B", "C"] {
        schedule
            .request_target(
                id,
                PosIntTP { t: 0.0, p: 90.0 },
                &Request::new(Command::PosIntTP, (10.0, 100.0), "shared group move"),
            )
            .unwrap();
    }

    let mut supply_groups = HashMap::new();
    supply_groups.insert("A".to_string(), "PS1".to_string());
    supply_groups.insert("B".to_string(), "PS1".to_string());
    supply_groups.insert("C".to_string(), "PS1".to_string());

    let (tables, failures) = schedule.schedule_moves(CollisionMode::None, &supply_groups);
    assert!(failures.is_empty());

    let starts: Vec<f64> = ["A", "B", "C"]
        .iter()
        .map(|id| tables[*id].rows().first().map(|r| r.prepause).unwrap_or(0.0))
        .collect();
    assert_ne!(starts[0], starts[1]);
    assert_ne!(starts[1], starts[2]);
}
