//! Frame sequencer behaviour observed through the register interface.

use emu_core::{Observable, Value};
use ricoh_apu_2a03::{Apu, FrameMode};

fn tick(apu: &mut Apu, cycles: u32) {
    for _ in 0..cycles {
        apu.tick();
    }
}

fn query_u8(apu: &Apu, path: &str) -> u8 {
    match apu.query(path) {
        Some(Value::U8(v)) => v,
        other => panic!("{path}: {other:?}"),
    }
}

#[test]
fn five_step_write_clocks_half_frame_immediately() {
    let mut apu = Apu::default();
    apu.write(0x4015, 0x01);
    apu.write(0x4000, 0x10); // no halt, constant volume
    apu.write(0x4003, 0x18); // length index 3 = 2

    assert_eq!(query_u8(&apu, "pulse1.length"), 2);
    apu.write(0x4017, 0xC0);
    assert_eq!(apu.frame_mode(), FrameMode::FiveStep);
    assert_eq!(query_u8(&apu, "pulse1.length"), 1);
    apu.write(0x4017, 0xC0);
    assert_eq!(query_u8(&apu, "pulse1.length"), 0);
    assert_eq!(apu.read(0x4015) & 0x01, 0);
}

#[test]
fn four_step_write_does_not_clock() {
    let mut apu = Apu::default();
    apu.write(0x4015, 0x01);
    apu.write(0x4003, 0x18);
    apu.write(0x4017, 0x00);
    assert_eq!(query_u8(&apu, "pulse1.length"), 2);
}

#[test]
fn length_counters_clock_twice_per_four_step_frame() {
    let mut apu = Apu::default();
    apu.write(0x4017, 0x40);
    apu.write(0x4015, 0x08);
    apu.write(0x400C, 0x10);
    apu.write(0x400F, 0x18); // length 2

    tick(&mut apu, 14_912);
    assert_eq!(query_u8(&apu, "noise.length"), 2);
    tick(&mut apu, 1);
    assert_eq!(query_u8(&apu, "noise.length"), 1);
    tick(&mut apu, 29_829 - 14_913);
    assert_eq!(query_u8(&apu, "noise.length"), 0);
}

#[test]
fn halt_flag_freezes_length() {
    let mut apu = Apu::default();
    apu.write(0x4017, 0x40);
    apu.write(0x4015, 0x02);
    apu.write(0x4004, 0x30); // halt + constant volume
    apu.write(0x4007, 0x18);

    tick(&mut apu, 60_000);
    assert_eq!(query_u8(&apu, "pulse2.length"), 2);
}

#[test]
fn envelope_decays_on_quarter_frames() {
    let mut apu = Apu::default();
    apu.write(0x4017, 0x40);
    apu.write(0x4015, 0x01);
    apu.write(0x4000, 0x20); // loop/halt, envelope period 0
    apu.write(0x4003, 0x08);

    tick(&mut apu, 7_457);
    assert_eq!(query_u8(&apu, "pulse1.envelope"), 15);
    tick(&mut apu, 14_913 - 7_457);
    assert_eq!(query_u8(&apu, "pulse1.envelope"), 14);
}

#[test]
fn frame_irq_sets_again_each_frame() {
    let mut apu = Apu::default();
    tick(&mut apu, 29_829);
    assert!(apu.irq_pending());
    let _ = apu.read(0x4015);
    assert!(!apu.irq_pending());
    tick(&mut apu, 29_829);
    assert!(apu.irq_pending());
}
