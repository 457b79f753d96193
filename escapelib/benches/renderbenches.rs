use core::num::NonZeroU32;

use color_depth::{Color, ColorDepth};
use criterion::{criterion_group, criterion_main, Criterion};
use escapelib::{
    render_fractal, AntiAliasing, Fractal, FractalKind, Gradient, RenderOptions,
    RenderingParameters,
};

fn get_inputs(
    width: u32,
    height: u32,
    quad_size: u32,
    anti_aliasing: AntiAliasing,
) -> (Fractal, RenderingParameters, RenderOptions) {
    let fractal = Fractal::new(FractalKind::Mandelbrot, -2.0, -1.2, 0.5, 1.2, 4.0, 255);

    let stops = [
        Color::from_packed32(0x000000),
        Color::from_packed32(0xff8800),
        Color::from_packed32(0xffffff),
    ];
    let parameters = RenderingParameters {
        gradient: Gradient::new(&stops, 1024).unwrap(),
        space_color: Color::from_packed32(0x000000),
        multiplier: 1.0,
    };

    let options = RenderOptions {
        width: NonZeroU32::new(width).unwrap(),
        height: NonZeroU32::new(height).unwrap(),
        depth: ColorDepth::Eight,
        quad_size: NonZeroU32::new(quad_size).unwrap(),
        threshold: 3.5e-3,
        anti_aliasing,
    };

    (fractal, parameters, options)
}

fn evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");

    let (fractal, parameters, options) = get_inputs(480, 320, 1, AntiAliasing::None);
    group.bench_function("480x320 pointwise", |b| {
        b.iter(|| render_fractal(&fractal, &parameters, &options))
    });

    let (fractal, parameters, options) = get_inputs(480, 320, 16, AntiAliasing::None);
    group.bench_function("480x320 adaptive", |b| {
        b.iter(|| render_fractal(&fractal, &parameters, &options))
    });
}

fn anti_aliasing(c: &mut Criterion) {
    let mut group = c.benchmark_group("anti-aliasing");
    group.sample_size(20);

    let (fractal, parameters, options) =
        get_inputs(320, 240, 16, AntiAliasing::GaussianBlur { radius: 3.0 });
    group.bench_function("320x240 gaussian blur", |b| {
        b.iter(|| render_fractal(&fractal, &parameters, &options))
    });

    let (fractal, parameters, options) =
        get_inputs(320, 240, 16, AntiAliasing::Oversampling { factor: 3.0 });
    group.bench_function("320x240 3x oversampled", |b| {
        b.iter(|| render_fractal(&fractal, &parameters, &options))
    });
}

criterion_group!(benches, evaluation, anti_aliasing);
criterion_main!(benches);
