//! Per-frame gaze work: locate planning, gaze fusion and pose composition.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use eyegaze_core::gaze::{self, ActionTable};
use eyegaze_core::{EyeSample, math, tracker};

const GAZE_ACTION: u64 = 0xA1;

fn eye(yaw: f32) -> EyeSample {
    EyeSample {
        is_valid: true,
        pose: math::make_pose(math::rotation_roll_pitch_yaw(0.0, yaw, 0.0), math::ORIGIN),
        confidence: 0.9,
    }
}

fn bench_locate_plan(c: &mut Criterion) {
    let mut table = ActionTable::new();
    table.record_bindings([(GAZE_ACTION, gaze::GAZE_POSE_PATHS[0])]);
    for space in 0..64u64 {
        let action = if space == 7 { GAZE_ACTION } else { 0xB0 + space };
        table.insert_space(0x100 + space, 0x10, action, math::identity());
    }
    let mut group = c.benchmark_group("plan_locate");
    group.bench_function("gaze_in_local", |b| {
        b.iter(|| black_box(table.plan_locate(black_box(0x107), black_box(0x900))));
    });
    group.bench_function("untracked", |b| {
        b.iter(|| black_box(table.plan_locate(black_box(0x900), black_box(0x901))));
    });
    group.finish();
}

fn bench_gaze(c: &mut Criterion) {
    let (left, right) = (eye(0.1), eye(0.3));
    c.bench_function("fuse_social_gazes", |b| {
        b.iter(|| black_box(tracker::fuse_social_gazes(black_box(&left), black_box(&right))));
    });

    let view = math::make_pose(math::identity().orientation, math::vec3(0.0, 1.7, 0.0));
    let direction = math::normalize(math::vec3(0.2, -0.1, -1.0));
    c.bench_function("compose_gaze_location", |b| {
        b.iter(|| {
            black_box(gaze::compose_gaze_location(
                black_box(direction),
                math::identity(),
                black_box(view),
                false,
            ))
        });
    });
}

criterion_group!(benches, bench_locate_plan, bench_gaze);
criterion_main!(benches);
