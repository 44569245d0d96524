//! # Kinematics and Control Cycle Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use drive_lib::{
    drive_ctrl::{DriveCmd, Drivetrain, DrivetrainInit, ExecContext, InputData, Params},
    kinematics::{self, BodyVelocity, SwerveKinematics, WheelPosition, NUM_MODULES}
};
use util::module::State;

fn kinematics_benchmark(c: &mut Criterion) {
    // ---- Build the kinematics from the shipped geometry ----

    let params: Params = util::params::parse(
        include_str!("../../params/drivetrain.toml")
    ).unwrap();
    let kin = SwerveKinematics::new(params.wheel_offsets_m).unwrap();

    let velocity = BodyVelocity::new(2.5, -1.0, 1.5);
    let states = kin.to_wheel_states(&velocity);
    let deltas = [WheelPosition::new(0.02, 0.3); NUM_MODULES];

    // ---- Benchmarks ----

    c.bench_function("to_wheel_states", |b| b.iter(|| {
        let mut s = kin.to_wheel_states(black_box(&velocity));
        kinematics::desaturate(&mut s, params.max_linear_speed_ms);
        s
    }));

    c.bench_function("to_body_velocity", |b| b.iter(
        || kin.to_body_velocity(black_box(&states))
    ));

    c.bench_function("to_twist", |b| b.iter(
        || kin.to_twist(black_box(&deltas))
    ));

    c.bench_function("discretize", |b| b.iter(
        || kinematics::discretize(black_box(&velocity), params.cycle_period_s)
    ));
}

fn cycle_benchmark(c: &mut Criterion) {
    let params: Params = util::params::parse(
        include_str!("../../params/drivetrain.toml")
    ).unwrap();

    let mut drivetrain = Drivetrain::init(DrivetrainInit {
        params,
        context: ExecContext::Sim
    }).unwrap();

    drivetrain.proc(&InputData {
        disabled: false,
        cmd: Some(DriveCmd::Velocity {
            forward_ms: 1.0, strafe_ms: 0.5, angular_rads: 0.8, field_relative: true
        })
    }).unwrap();

    let input = InputData { disabled: false, cmd: None };

    c.bench_function("drivetrain_cycle", |b| b.iter(
        || drivetrain.proc(black_box(&input)).unwrap()
    ));
}

criterion_group!(benches, kinematics_benchmark, cycle_benchmark);
criterion_main!(benches);
