//! Integration tests for context lifecycle and frame transfer.


use std::sync::{Arc, Mutex};
use std::thread;

use bridge_fixtures::{config_with, patterned_frame, yuv420, CountingLegacy, MockApi};
use placebo_bridge::bridge::{
    BackendKind, BridgeConfig, BridgeError, Context, ContextState, DownloadError, InitError,
    RenderError, TextureRole, UploadError,
};
use placebo_bridge::filters::{DebandParams, FilterOp};
use placebo_bridge::image::{ImageLayout, OwnedFrame, PlaneFormat, PlaneLayout};
use placebo_bridge::logging::{LogLevel, Logger};

fn ready_context(api: MockApi) -> Context<MockApi> {
    Context::create(api, config_with(&[BackendKind::Native])).unwrap()
}

fn run_frame(ctx: &mut Context<MockApi>, op: &FilterOp, src: &OwnedFrame) -> OwnedFrame {
    let layout = op.output_layout(src.layout()).unwrap();
    let mut dst = OwnedFrame::new(layout).unwrap();
    ctx.process(op, &src.as_image(), &mut dst.as_image_mut())
        .unwrap();
    dst
}

#[test]
fn test_create_process_destroy_is_leak_free() {
    let api = MockApi::new();
    let ledger = api.ledger();
    let mut ctx = ready_context(api);
    assert_eq!(ctx.state(), ContextState::Ready);
    assert_eq!(ctx.backend(), Some(BackendKind::Native));

    let src = patterned_frame(yuv420(64, 32), 1, 0);
    run_frame(&mut ctx, &FilterOp::Passthrough, &src);
    run_frame(&mut ctx, &FilterOp::Deband(DebandParams::default()), &src);

    ctx.destroy();
    assert_eq!(ctx.state(), ContextState::Destroyed);
    let ledger = ledger.lock().unwrap();
    assert!(ledger.is_clean(), "{ledger:?}");
    assert_eq!(ledger.dither_created, 1);
}

#[test]
fn test_destroy_is_idempotent() {
    let api = MockApi::new();
    let ledger = api.ledger();
    let mut ctx = ready_context(api);

    ctx.destroy();
    let destroyed = ledger.lock().unwrap().destroyed;
    ctx.destroy();
    drop(ctx);

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.destroyed, destroyed);
    assert!(ledger.is_clean());
}

#[test]
fn test_drop_releases_everything() {
    let api = MockApi::new();
    let ledger = api.ledger();
    {
        let mut ctx = ready_context(api);
        let src = patterned_frame(yuv420(32, 32), 1, 3);
        run_frame(&mut ctx, &FilterOp::Passthrough, &src);
    }
    assert!(ledger.lock().unwrap().is_clean());
}

#[test]
fn test_textures_are_reused_for_identical_frames() {
    let api = MockApi::new();
    let ledger = api.ledger();
    let mut ctx = ready_context(api);
    let src = patterned_frame(yuv420(64, 64), 1, 0);

    run_frame(&mut ctx, &FilterOp::Passthrough, &src);
    let after_first = ledger.lock().unwrap().textures_created;
    assert_eq!(after_first, 6);

    for _ in 0..5 {
        run_frame(&mut ctx, &FilterOp::Passthrough, &src);
    }
    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.textures_created, after_first);
    assert_eq!(ledger.textures_destroyed, 0);
    assert_eq!(ctx.frames_rendered(), 6);
}

#[test]
fn test_textures_are_recreated_on_size_change() {
    let api = MockApi::new();
    let ledger = api.ledger();
    let mut ctx = ready_context(api);

    run_frame(&mut ctx, &FilterOp::Passthrough, &patterned_frame(yuv420(64, 64), 1, 0));
    run_frame(&mut ctx, &FilterOp::Passthrough, &patterned_frame(yuv420(32, 64), 1, 0));

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.textures_created, 12);
    assert_eq!(ledger.textures_destroyed, 6);
}

#[test]
fn test_textures_are_recreated_on_format_change() {
    let api = MockApi::new();
    let ledger = api.ledger();
    let mut ctx = ready_context(api);

    let ten_bit = ImageLayout::yuv420(64, 64, PlaneFormat::new(1, 10)).unwrap();
    run_frame(&mut ctx, &FilterOp::Passthrough, &patterned_frame(yuv420(64, 64), 1, 0));
    let dst = run_frame(&mut ctx, &FilterOp::Passthrough, &patterned_frame(ten_bit.clone(), 1, 0));
    assert_eq!(dst.layout(), &ten_bit);

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.textures_created, 12);
    assert_eq!(ledger.textures_destroyed, 6);
}

#[test]
fn test_operations_outside_ready_are_invalid_state() {
    let mut ctx = Context::new(MockApi::new(), BridgeConfig::default());
    let src = patterned_frame(yuv420(16, 16), 1, 0);

    let err = ctx.upload(&src.as_image()).unwrap_err();
    assert!(err.is_invalid_state());

    ctx.destroy();
    let err = ctx.upload(&src.as_image()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::InvalidState {
            operation: "upload",
            state: ContextState::Destroyed
        }
    ));
    assert!(ctx
        .init(&mut CountingLegacy::default())
        .unwrap_err()
        .is_invalid_state());
}

#[test]
fn test_init_twice_is_rejected() {
    let mut ctx = ready_context(MockApi::new());
    let err = ctx.init(&mut CountingLegacy::default()).unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(ctx.state(), ContextState::Ready);
}

#[test]
fn test_1080p_420_round_trip_with_padded_strides() {
    let mut ctx = ready_context(MockApi::new());
    let src = patterned_frame(yuv420(1920, 1080), 64, 11);
    let mut dst = OwnedFrame::with_alignment(yuv420(1920, 1080), 32).unwrap();

    ctx.process(&FilterOp::Passthrough, &src.as_image(), &mut dst.as_image_mut())
        .unwrap();

    assert!(src.pixels_eq(&dst));
    assert_eq!(dst.layout().plane_size(1), (960, 540));
}

#[test]
fn test_high_bit_depth_round_trip() {
    let mut ctx = ready_context(MockApi::new());
    let layout = ImageLayout::yuv420(128, 72, PlaneFormat::new(1, 10)).unwrap();
    let src = patterned_frame(layout, 16, 5);
    let dst = run_frame(&mut ctx, &FilterOp::Passthrough, &src);
    assert!(src.pixels_eq(&dst));
}

#[test]
fn test_device_failure_leaves_nothing_allocated() {
    let api = MockApi::failing_devices(&[BackendKind::Native, BackendKind::OpenGl]);
    let ledger = api.ledger();
    let mut ctx = Context::new(api, BridgeConfig::default());

    let err = ctx.init(&mut CountingLegacy::default()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Init(InitError::Device {
            backend: BackendKind::OpenGl,
            ..
        })
    ));
    assert_eq!(ctx.state(), ContextState::Destroyed);

    let ledger = ledger.lock().unwrap();
    assert_eq!(
        ledger.device_attempts,
        vec![BackendKind::Native, BackendKind::OpenGl]
    );
    assert_eq!(ledger.created, 0);
    assert!(ledger.is_clean());
}

#[test]
fn test_dispatch_failure_tears_down_device() {
    let api = MockApi {
        fail_dispatch: true,
        ..MockApi::default()
    };
    let ledger = api.ledger();
    let err = Context::create(api, config_with(&[BackendKind::Native]))
        .err()
        .unwrap();
    assert!(matches!(err, BridgeError::Init(InitError::Dispatch(_))));

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.created, 1);
    assert!(ledger.is_clean());
}

#[test]
fn test_renderer_failure_tears_down_dispatch_and_device() {
    let api = MockApi {
        fail_renderer: true,
        ..MockApi::default()
    };
    let ledger = api.ledger();
    let err = Context::create(api, config_with(&[BackendKind::Native]))
        .err()
        .unwrap();
    assert!(matches!(err, BridgeError::Init(InitError::Renderer(_))));

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.created, 2);
    assert!(ledger.is_clean());
}

#[test]
fn test_no_backends_configured() {
    let mut ctx = Context::new(MockApi::new(), config_with(&[]));
    let err = ctx.init(&mut CountingLegacy::default()).unwrap_err();
    assert!(matches!(err, BridgeError::Init(InitError::NoBackends)));
}

#[test]
fn test_fallback_backend_and_legacy_guard() {
    let api = MockApi::failing_devices(&[BackendKind::Native]);
    let mut ctx = Context::new(api, BridgeConfig::default());
    let mut legacy = CountingLegacy::default();

    ctx.init(&mut legacy).unwrap();
    assert_eq!(ctx.state(), ContextState::Ready);
    assert_eq!(ctx.backend(), Some(BackendKind::OpenGl));

    let expected = usize::from(BackendKind::OpenGl.requires_legacy_context());
    assert_eq!(legacy.acquired, expected);
    assert_eq!(legacy.released, expected);
}

#[test]
fn test_legacy_context_failure_moves_on() {
    let mut legacy = CountingLegacy {
        fail: true,
        ..Default::default()
    };
    let mut ctx = Context::new(
        MockApi::new(),
        config_with(&[BackendKind::OpenGl, BackendKind::Native]),
    );

    ctx.init(&mut legacy).unwrap();
    let expected = if BackendKind::OpenGl.requires_legacy_context() {
        BackendKind::Native
    } else {
        BackendKind::OpenGl
    };
    assert_eq!(ctx.backend(), Some(expected));
    assert_eq!(legacy.released, 0);
}

#[test]
fn test_independent_contexts_on_two_threads() {
    let api = MockApi::new();
    let ledger = api.ledger();

    thread::scope(|s| {
        for seed in 0..2u8 {
            let api = api.clone();
            s.spawn(move || {
                let mut ctx = ready_context(api);
                let src = patterned_frame(yuv420(96, 48), 8, seed);
                for _ in 0..10 {
                    let dst = run_frame(&mut ctx, &FilterOp::Passthrough, &src);
                    assert!(src.pixels_eq(&dst));
                }
                assert_eq!(ctx.frames_rendered(), 10);
            });
        }
    });

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.renders, 20);
    assert!(ledger.is_clean());
}

#[test]
fn test_fewer_planes_shrink_slots() {
    let api = MockApi::new();
    let ledger = api.ledger();
    let mut ctx = ready_context(api);

    run_frame(&mut ctx, &FilterOp::Passthrough, &patterned_frame(yuv420(32, 32), 1, 0));
    assert_eq!(ctx.input_slots(), 3);
    assert_eq!(ctx.output_slots(), 3);

    let gray = ImageLayout::new(32, 32, vec![PlaneLayout::new(0, 0, PlaneFormat::GRAY8)]).unwrap();
    run_frame(&mut ctx, &FilterOp::Passthrough, &patterned_frame(gray, 1, 0));
    assert_eq!(ctx.input_slots(), 1);
    assert_eq!(ctx.output_slots(), 1);

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.textures_destroyed, 4);
}

#[test]
fn test_out_of_order_stages_are_rejected() {
    let mut ctx = ready_context(MockApi::new());
    let src = patterned_frame(yuv420(16, 16), 1, 0);
    let mut dst = OwnedFrame::new(yuv420(16, 16)).unwrap();

    let err = ctx
        .invoke(&FilterOp::Passthrough, src.layout())
        .unwrap_err();
    assert!(matches!(err, BridgeError::Render(RenderError::NoInput)));

    let err = ctx.download(&mut dst.as_image_mut()).unwrap_err();
    assert!(matches!(err, BridgeError::Download(DownloadError::NotRendered)));

    ctx.upload(&src.as_image()).unwrap();
    let err = ctx.download(&mut dst.as_image_mut()).unwrap_err();
    assert!(matches!(err, BridgeError::Download(DownloadError::NotRendered)));

    ctx.upload(&src.as_image()).unwrap();
    ctx.invoke(&FilterOp::Passthrough, src.layout()).unwrap();
    ctx.download(&mut dst.as_image_mut()).unwrap();
    let err = ctx.download(&mut dst.as_image_mut()).unwrap_err();
    assert!(matches!(err, BridgeError::Download(DownloadError::NotRendered)));
    assert_eq!(ctx.state(), ContextState::Ready);
}

#[test]
fn test_download_into_wrong_shape_is_rejected() {
    let mut ctx = ready_context(MockApi::new());
    let src = patterned_frame(yuv420(16, 16), 1, 0);
    ctx.upload(&src.as_image()).unwrap();
    ctx.invoke(&FilterOp::Passthrough, src.layout()).unwrap();

    let mut dst = OwnedFrame::new(yuv420(32, 16)).unwrap();
    let err = ctx.download(&mut dst.as_image_mut()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Download(DownloadError::PlaneMismatch { plane: 0, .. })
    ));
}

#[test]
fn test_render_failure_keeps_context_ready() {
    let api = MockApi {
        fail_render: true,
        ..MockApi::default()
    };
    let mut ctx = ready_context(api);
    let src = patterned_frame(yuv420(16, 16), 1, 0);
    let mut dst = OwnedFrame::new(yuv420(16, 16)).unwrap();

    let err = ctx
        .process(&FilterOp::Passthrough, &src.as_image(), &mut dst.as_image_mut())
        .unwrap_err();
    assert!(matches!(err, BridgeError::Render(RenderError::Failed(_))));
    assert_eq!(ctx.state(), ContextState::Ready);
    assert_eq!(ctx.frames_rendered(), 0);
}

#[test]
fn test_logger_receives_init_errors() {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let logger = Logger::new(
        LogLevel::Error,
        Arc::new(move |level: LogLevel, msg: &str| sink.lock().unwrap().push((level, msg.to_string()))),
    );

    let api = MockApi::failing_devices(&[BackendKind::Native]);
    let mut ctx = Context::new(api, config_with(&[BackendKind::Native])).with_logger(logger);
    assert!(ctx.init(&mut CountingLegacy::default()).is_err());

    let messages = messages.lock().unwrap();
    assert!(!messages.is_empty());
    assert!(messages.iter().all(|(level, _)| *level <= LogLevel::Error));
    assert!(messages.iter().any(|(_, msg)| msg.contains("native")));
}

#[test]
fn test_input_texture_failure_mid_upload() {
    let api = MockApi::new();
    let ledger = api.ledger();
    let faults = api.faults();
    let mut ctx = ready_context(api);
    run_frame(&mut ctx, &FilterOp::Passthrough, &patterned_frame(yuv420(64, 64), 1, 0));

    let src = patterned_frame(yuv420(32, 32), 1, 4);
    let uploads = ledger.lock().unwrap().uploads;
    faults.lock().unwrap().texture = Some((TextureRole::Input, 1));
    let err = ctx.upload(&src.as_image()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Upload(UploadError::Texture { plane: 1, .. })
    ));
    assert_eq!(ctx.state(), ContextState::Ready);
    // Plane 0 made it across before the failure.
    assert_eq!(ledger.lock().unwrap().uploads, uploads + 1);

    let err = ctx
        .invoke(&FilterOp::Passthrough, src.layout())
        .unwrap_err();
    assert!(matches!(err, BridgeError::Render(RenderError::NoInput)));

    let dst = run_frame(&mut ctx, &FilterOp::Passthrough, &src);
    assert!(src.pixels_eq(&dst));
    assert_eq!(ctx.input_slots(), 3);

    drop(ctx);
    assert!(ledger.lock().unwrap().is_clean());
}

#[test]
fn test_output_texture_failure_is_a_render_error() {
    let api = MockApi::new();
    let ledger = api.ledger();
    let faults = api.faults();
    let mut ctx = ready_context(api);
    let src = patterned_frame(yuv420(32, 32), 1, 2);
    let mut dst = OwnedFrame::new(yuv420(32, 32)).unwrap();

    faults.lock().unwrap().texture = Some((TextureRole::Output, 2));
    let err = ctx
        .process(&FilterOp::Passthrough, &src.as_image(), &mut dst.as_image_mut())
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Render(RenderError::Texture { plane: 2, .. })
    ));
    assert_eq!(ctx.state(), ContextState::Ready);
    assert_eq!(ctx.frames_rendered(), 0);
    assert_eq!(ledger.lock().unwrap().renders, 0);

    ctx.process(&FilterOp::Passthrough, &src.as_image(), &mut dst.as_image_mut())
        .unwrap();
    assert!(src.pixels_eq(&dst));

    drop(ctx);
    assert!(ledger.lock().unwrap().is_clean());
}

#[test]
fn test_download_transfer_failure() {
    let api = MockApi::new();
    let faults = api.faults();
    let mut ctx = ready_context(api);
    let src = patterned_frame(yuv420(32, 32), 1, 8);
    let mut dst = OwnedFrame::new(yuv420(32, 32)).unwrap();

    faults.lock().unwrap().download = Some(1);
    let err = ctx
        .process(&FilterOp::Passthrough, &src.as_image(), &mut dst.as_image_mut())
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Download(DownloadError::Transfer { plane: 1, .. })
    ));
    assert_eq!(ctx.state(), ContextState::Ready);

    let err = ctx.download(&mut dst.as_image_mut()).unwrap_err();
    assert!(matches!(err, BridgeError::Download(DownloadError::NotRendered)));

    ctx.process(&FilterOp::Passthrough, &src.as_image(), &mut dst.as_image_mut())
        .unwrap();
    assert!(src.pixels_eq(&dst));
}

#[test]
fn test_download_checks_every_plane_before_writing() {
    let mut ctx = ready_context(MockApi::new());
    let src = patterned_frame(yuv420(16, 16), 1, 0);

    // Plane 0 matches, plane 1 is full size instead of 8x8.
    let mut dst = OwnedFrame::new(ImageLayout::planar444(16, 16, PlaneFormat::GRAY8).unwrap())
        .unwrap();
    dst.plane_data_mut(0).fill(0x11);
    ctx.upload(&src.as_image()).unwrap();
    ctx.invoke(&FilterOp::Passthrough, src.layout()).unwrap();
    let err = ctx.download(&mut dst.as_image_mut()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Download(DownloadError::PlaneMismatch { plane: 1, .. })
    ));
    assert!(dst.plane_data(0).iter().all(|&b| b == 0x11));

    let mut dst = OwnedFrame::new(ImageLayout::yuv420(16, 16, PlaneFormat::GRAY16).unwrap())
        .unwrap();
    ctx.upload(&src.as_image()).unwrap();
    ctx.invoke(&FilterOp::Passthrough, src.layout()).unwrap();
    let err = ctx.download(&mut dst.as_image_mut()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Download(DownloadError::PlaneMismatch {
            plane: 0,
            format: PlaneFormat::GRAY8,
            got_format: PlaneFormat::GRAY16,
            ..
        })
    ));
    assert!(err.to_string().contains("16-bit"), "{err}");
}
