use std::cell::RefCell;
use std::rc::Rc;

use shogle_core::backend::{HeadlessBackend, HeadlessProbe};
use shogle_core::handle::{PipelineHandle, RawHandle};
use shogle_core::render::{
    DrawOptions, ExternalCmdDesc, IndexBufferBind, IndexFormat, RenderCmdDesc, Uniform,
    UniformData, VertexBufferBind,
};
use shogle_core::resource::{
    BufferData, BufferDesc, BufferKind, ClearState, Color, Extent2d, FramebufferAttachment,
    FramebufferDesc, PipelineDesc, ShaderDesc, ShaderStage, TextureDesc, TextureFormat,
    VertexAttribute, VertexFormat,
};
use shogle_core::{Context, ContextConfig, ErrorKind};

const VS: &str = r#"#version 330 core
layout(location = 0) in vec3 a_pos;
layout(location = 1) in vec3 a_color;
out vec3 v_color;
void main() {
    v_color = a_color;
    gl_Position = vec4(a_pos, 1.0);
}
"#;

const FS: &str = r#"#version 330 core
in vec3 v_color;
out vec4 frag;
uniform float u_alpha;
void main() { frag = vec4(v_color, u_alpha); }
"#;

fn setup() -> (Context, HeadlessProbe) {
    shogle_core::logging::init_test_logging();
    let backend = HeadlessBackend::new();
    let probe = backend.probe();
    let config = ContextConfig { report_leaks: false, ..ContextConfig::default() };
    (Context::new(backend, config).unwrap(), probe)
}

fn colored_pipeline(ctx: &mut Context) -> PipelineHandle {
    let vs = ctx.create_shader(&ShaderDesc::new(ShaderStage::Vertex, VS)).unwrap();
    let fs = ctx.create_shader(&ShaderDesc::new(ShaderStage::Fragment, FS)).unwrap();
    let stride = 6 * 4;
    let attrs = [
        VertexAttribute::new(0, VertexFormat::F32x3, 0, stride),
        VertexAttribute::new(1, VertexFormat::F32x3, 12, stride),
    ];
    let pipeline = ctx.create_pipeline(&PipelineDesc::new(&[vs, fs], &attrs)).unwrap();
    ctx.destroy_shader(vs);
    ctx.destroy_shader(fs);
    pipeline
}

#[rustfmt::skip]
const TRIANGLE: [f32; 36] = [
    -0.5, -0.5, 0.0,   1.0, 0.0, 0.0,
     0.5, -0.5, 0.0,   0.0, 1.0, 0.0,
     0.0,  0.5, 0.0,   0.0, 0.0, 1.0,
    -0.5,  0.5, 0.0,   1.0, 1.0, 0.0,
     0.5,  0.5, 0.0,   0.0, 1.0, 1.0,
     0.0, -0.5, 0.0,   1.0, 0.0, 1.0,
];

#[test]
fn triangle_reaches_the_default_target() {
    let (mut ctx, probe) = setup();
    let pipeline = colored_pipeline(&mut ctx);
    let vbo = ctx
        .create_buffer(&BufferDesc::with_data(BufferKind::Vertex, bytemuck::cast_slice(&TRIANGLE)))
        .unwrap();

    let vertex_buffers = [
        VertexBufferBind { location: 0, buffer: vbo, offset: 0 },
        VertexBufferBind { location: 1, buffer: vbo, offset: 0 },
    ];
    let uniforms = [Uniform::new("u_alpha", UniformData::Float(1.0))];
    let cmd = RenderCmdDesc {
        vertex_buffers: &vertex_buffers,
        uniforms: &uniforms,
        options: DrawOptions::vertices(3),
        ..RenderCmdDesc::new(ctx.default_framebuffer(), pipeline)
    };

    ctx.start_frame();
    ctx.submit_render_command(&cmd);
    let stats = ctx.end_frame();
    ctx.swap_buffers().unwrap();

    assert_eq!((stats.batches, stats.commands, stats.dropped_commands), (1, 1, 0));
    let frame = probe.last_frame().unwrap();
    assert_eq!(frame.batches.len(), 1);
    let batch = &frame.batches[0];
    assert_eq!(batch.target, RawHandle(0));
    assert_eq!(batch.commands.len(), 1);
    assert_eq!(batch.commands[0].count, 3);
    assert_eq!(batch.commands[0].pipeline, ctx.raw_pipeline(pipeline));
    assert!(!batch.commands[0].indexed);
    assert_eq!(probe.swaps(), 1);
}

#[test]
fn sort_groups_reorder_execution() {
    let (mut ctx, _) = setup();
    let target = ctx.default_framebuffer();
    let log = Rc::new(RefCell::new(Vec::new()));

    ctx.start_frame();
    for (tag, group) in [("2", 2u32), ("0a", 0), ("1", 1), ("0b", 0)] {
        let log = Rc::clone(&log);
        ctx.submit_external_command(&ExternalCmdDesc::new(target, group), move |t| {
            assert_eq!(t.sort_group, group);
            log.borrow_mut().push(tag);
        });
    }
    ctx.end_frame();

    assert_eq!(*log.borrow(), ["0a", "0b", "1", "2"]);
}

#[test]
fn draws_and_externals_interleave_by_group() {
    let (mut ctx, probe) = setup();
    let pipeline = colored_pipeline(&mut ctx);
    let vbo = ctx
        .create_buffer(&BufferDesc::with_data(BufferKind::Vertex, bytemuck::cast_slice(&TRIANGLE)))
        .unwrap();
    let ibo = ctx
        .create_buffer(&BufferDesc::with_data(BufferKind::Index, bytemuck::cast_slice(&[0u16, 1, 2])))
        .unwrap();
    let vertex_buffers = [VertexBufferBind { location: 0, buffer: vbo, offset: 0 }];
    let target = ctx.default_framebuffer();

    let draw = RenderCmdDesc {
        vertex_buffers: &vertex_buffers,
        index_buffer: Some(IndexBufferBind { buffer: ibo, format: IndexFormat::U16, offset: 0 }),
        options: DrawOptions::instanced(3, 4),
        sort_group: 5,
        ..RenderCmdDesc::new(target, pipeline)
    };

    ctx.start_frame();
    ctx.submit_render_command(&draw);
    ctx.submit_external_fn(&ExternalCmdDesc::new(target, 1), |_| {});
    ctx.end_frame();

    let frame = probe.last_frame().unwrap();
    let cmds = &frame.batches[0].commands;
    assert!(cmds[0].is_external());
    assert_eq!(cmds[1].sort_group, 5);
    assert!(cmds[1].indexed);
    assert_eq!(cmds[1].instances, 4);
}

#[test]
fn buffer_upload_round_trips() {
    let (mut ctx, probe) = setup();
    let ubo = ctx.create_buffer(&BufferDesc::dynamic(BufferKind::Uniform, 16)).unwrap();
    let values = [1.0f32, 2.0, 3.0, 4.0];
    ctx.buffer_upload(ubo, BufferData::from_pod(&values)).unwrap();

    let bytes = probe.buffer_bytes(ctx.raw_buffer(ubo).unwrap()).unwrap();
    let read: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(read, values);
}

#[test]
fn offscreen_target_keeps_its_clear_state() {
    let (mut ctx, probe) = setup();
    let color = ctx
        .create_texture(&TextureDesc::render_target(TextureFormat::Rgba8, 256, 256))
        .unwrap();
    let depth = ctx
        .create_texture(&TextureDesc::render_target(TextureFormat::Depth24Stencil8, 256, 256))
        .unwrap();
    let attachments = [FramebufferAttachment::new(color)];
    let fb = ctx
        .create_framebuffer(
            &FramebufferDesc::new(Extent2d::new(256, 256), &attachments)
                .with_depth(FramebufferAttachment::new(depth)),
        )
        .unwrap();
    let clear = ClearState::default().with_color(Color::from_rgba8(30, 30, 40, 255));
    ctx.set_clear_state(fb, clear).unwrap();

    let screen = ctx.default_framebuffer();
    ctx.start_frame();
    ctx.submit_external_fn(&ExternalCmdDesc::new(screen, 0), |_| {});
    ctx.submit_external_fn(&ExternalCmdDesc::new(fb, 0), |_| {});
    ctx.submit_external_fn(&ExternalCmdDesc::new(screen, 1), |_| {});
    let stats = ctx.end_frame();

    assert_eq!(stats.batches, 2);
    let frame = probe.last_frame().unwrap();
    assert_eq!(frame.batches[0].target, RawHandle(0));
    assert_eq!(frame.batches[0].commands.len(), 2);
    assert_eq!(frame.batches[1].target, ctx.raw_framebuffer(fb).unwrap());
    assert_eq!(frame.batches[1].clear, clear);
}

#[test]
fn lifecycle_counts_and_stale_handles() {
    let (mut ctx, probe) = setup();
    let a = ctx.create_buffer(&BufferDesc::dynamic(BufferKind::Vertex, 64)).unwrap();
    let b = ctx.create_buffer(&BufferDesc::dynamic(BufferKind::Vertex, 64)).unwrap();
    assert_eq!(ctx.buffer_count(), 2);

    ctx.destroy_buffer(a);
    let c = ctx.create_buffer(&BufferDesc::dynamic(BufferKind::Vertex, 64)).unwrap();
    assert_ne!(a, c, "a reused slot gets a new generation");
    assert!(ctx.buffer_info(a).is_none());

    let err = ctx.buffer_upload(a, BufferData::new(&[0])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);

    ctx.destroy_buffer(b);
    ctx.destroy_buffer(c);
    assert_eq!(ctx.buffer_count(), 0);
    assert_eq!(probe.live_objects(), 0);
}

#[test]
fn teardown_releases_everything() {
    let (mut ctx, probe) = setup();
    let _pipeline = colored_pipeline(&mut ctx);
    let _ = ctx.create_buffer(&BufferDesc::dynamic(BufferKind::Uniform, 32)).unwrap();
    let _ = ctx
        .create_texture(&TextureDesc::render_target(TextureFormat::R8, 16, 16))
        .unwrap();

    ctx.start_frame();
    ctx.end_frame();
    drop(ctx);

    assert_eq!(probe.live_objects(), 0);
    let kinds: Vec<_> = probe.destroyed().into_iter().map(|(k, _)| k).collect();
    // The two shaders were destroyed right after linking.
    assert_eq!(kinds, ["shader", "shader", "pipeline", "texture", "buffer"]);
}
