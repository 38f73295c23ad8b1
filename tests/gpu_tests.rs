//! Integration tests for the wgpu backend.
//!
//! Every test returns early when the machine has no usable adapter.


use bridge_fixtures::{patterned_frame, yuv420};
use placebo_bridge::bridge::{ApiError, BridgeConfig, BridgeError, Context, RenderError};
use placebo_bridge::filters::{DebandParams, FilterOp, ResampleParams, ShaderProgram, TonemapParams};
use placebo_bridge::gpu::WgpuApi;
use placebo_bridge::image::{ImageLayout, OwnedFrame, PlaneFormat, PlaneLayout};

fn create_context() -> Option<Context<WgpuApi>> {
    let config = BridgeConfig::default();
    match Context::create(WgpuApi::new(&config), config) {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("Skipping GPU test: {e}");
            None
        }
    }
}

fn run(ctx: &mut Context<WgpuApi>, op: &FilterOp, src: &OwnedFrame) -> OwnedFrame {
    let layout = op.output_layout(src.layout()).unwrap();
    let mut dst = OwnedFrame::new(layout).unwrap();
    ctx.process(op, &src.as_image(), &mut dst.as_image_mut())
        .unwrap();
    dst
}

fn flat_frame(layout: ImageLayout, value: u8) -> OwnedFrame {
    let mut frame = OwnedFrame::new(layout).unwrap();
    for plane in 0..frame.layout().num_planes() {
        frame.plane_data_mut(plane).fill(value);
    }
    frame
}

#[test]
fn test_gpu_passthrough_420_is_bit_exact() {
    let Some(mut ctx) = create_context() else {
        return;
    };
    let src = patterned_frame(yuv420(1920, 1080), 64, 1);
    let dst = run(&mut ctx, &FilterOp::Passthrough, &src);
    assert!(src.pixels_eq(&dst));

    // Second frame goes through the reused textures.
    let src = patterned_frame(yuv420(1920, 1080), 64, 2);
    let dst = run(&mut ctx, &FilterOp::Passthrough, &src);
    assert!(src.pixels_eq(&dst));
    assert_eq!(ctx.frames_rendered(), 2);
}

#[test]
fn test_gpu_passthrough_float_plane() {
    let Some(mut ctx) = create_context() else {
        return;
    };
    let layout = ImageLayout::new(33, 17, vec![PlaneLayout::new(0, 0, PlaneFormat::GRAYF)]).unwrap();
    let mut src = OwnedFrame::new(layout).unwrap();
    let values: Vec<f32> = (0..33 * 17).map(|i| i as f32 / 561.0).collect();
    src.plane_data_mut(0)
        .copy_from_slice(bytemuck::cast_slice(&values));

    let dst = run(&mut ctx, &FilterOp::Passthrough, &src);
    assert!(src.pixels_eq(&dst));
}

#[test]
fn test_gpu_deband_keeps_flat_frame() {
    let Some(mut ctx) = create_context() else {
        return;
    };
    let params = DebandParams {
        planes: 0b111,
        grain: 0.0,
        dither: false,
        ..Default::default()
    };
    let src = flat_frame(yuv420(128, 64), 90);
    let dst = run(&mut ctx, &FilterOp::Deband(params), &src);
    assert!(src.pixels_eq(&dst));
}

#[test]
fn test_gpu_resample_flat_frame() {
    let Some(mut ctx) = create_context() else {
        return;
    };
    let src = flat_frame(yuv420(128, 64), 200);
    for params in [
        ResampleParams::new(64, 32),
        ResampleParams::new(256, 96).with_filter(placebo_bridge::filters::FilterKernel::Lanczos),
        ResampleParams {
            clamp: 1.0,
            taper: 0.5,
            antiring: 1.0,
            ..ResampleParams::new(200, 80).with_filter(placebo_bridge::filters::FilterKernel::Lanczos)
        },
    ] {
        let op = FilterOp::Resample(params);
        let dst = run(&mut ctx, &op, &src);
        let expected = flat_frame(dst.layout().clone(), 200);
        for plane in 0..3 {
            let diff = dst
                .plane_data(plane)
                .iter()
                .zip(expected.plane_data(plane))
                .map(|(a, b)| a.abs_diff(*b))
                .max()
                .unwrap();
            assert!(diff <= 1, "plane {plane} differs by {diff}");
        }
    }
}

#[test]
fn test_gpu_tonemap_unity_gain() {
    let Some(mut ctx) = create_context() else {
        return;
    };
    let params = TonemapParams {
        src_peak: 100.0,
        dst_peak: 100.0,
        ..Default::default()
    };
    let layout = ImageLayout::planar444(64, 64, PlaneFormat::GRAY8).unwrap();
    let src = patterned_frame(layout, 1, 9);
    let dst = run(&mut ctx, &FilterOp::Tonemap(params), &src);
    assert!(src.pixels_eq(&dst));
}

#[test]
fn test_gpu_user_shader_inverts() {
    let Some(mut ctx) = create_context() else {
        return;
    };
    let program = ShaderProgram::new(
        r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let v = textureLoad(plane0, pixel_pos(in), 0);
    return vec4<f32>(1.0) - v;
}
"#,
    )
    .unwrap();
    let layout = ImageLayout::new(32, 32, vec![PlaneLayout::new(0, 0, PlaneFormat::GRAY8)]).unwrap();
    let src = patterned_frame(layout, 1, 4);
    let dst = run(&mut ctx, &FilterOp::Shader(program), &src);

    for (a, b) in src.plane_data(0).iter().zip(dst.plane_data(0)) {
        assert_eq!(255 - a, *b);
    }
}

#[test]
fn test_gpu_device_rejected_shader_is_a_render_error() {
    let Some(mut ctx) = create_context() else {
        return;
    };
    // Built directly so naga's interface checks are skipped and the device
    // sees an integer output bound to a unorm target.
    let program = ShaderProgram {
        source: "@fragment fn fs_main(in: VsOut) -> @location(0) vec4<u32> { return vec4<u32>(1u); }"
            .to_string(),
        id: 0x5eed,
        width: None,
        height: None,
    };
    let layout = ImageLayout::new(32, 32, vec![PlaneLayout::new(0, 0, PlaneFormat::GRAY8)]).unwrap();
    let src = patterned_frame(layout.clone(), 1, 6);
    let mut dst = OwnedFrame::new(layout).unwrap();

    let err = ctx
        .process(&FilterOp::Shader(program), &src.as_image(), &mut dst.as_image_mut())
        .unwrap_err();
    assert!(
        matches!(err, BridgeError::Render(RenderError::Failed(ApiError::Failed(_)))),
        "{err}"
    );

    let dst = run(&mut ctx, &FilterOp::Passthrough, &src);
    assert!(src.pixels_eq(&dst));
}
