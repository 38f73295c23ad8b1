//! Host-facing plugin surface.
//!
//! A host registers the plugin's filters through [`plugin_init`], builds
//! filters from argument maps, and drives them frame by frame through
//! [`FrameFilter`]. Errors at this edge are `anyhow` errors carrying the
//! filter name and frame number.

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::bridge::{BridgeConfig, Context, GpuApi, LegacyContext, NoLegacyContext};
use crate::filters::{
    deband, resample, shader, tonemap, DebandParams, FilterError, FilterOp, FilterSignature,
    ResampleParams, ShaderParams, ShaderProgram, TonemapParams,
};
use crate::gpu::WgpuApi;
use crate::image::{Image, ImageLayout, ImageMut};

/// Identity the plugin registers under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginInfo {
    pub identifier: &'static str,
    pub namespace: &'static str,
    pub description: &'static str,
}

pub const PLUGIN_INFO: PluginInfo = PluginInfo {
    identifier: "com.vs.placebo",
    namespace: "placebo",
    description: "libplacebo plugin for VapourSynth",
};

/// Filter arguments as handed over by the host, clip excluded.
pub type FilterArgs = Map<String, Value>;

/// Builds a filter op from checked host arguments.
pub type Constructor = fn(&FilterArgs) -> Result<FilterOp, FilterError>;

/// Every filter the plugin exposes.
pub const FILTERS: [(FilterSignature, Constructor); 4] = [
    (deband::SIGNATURE, deband_op),
    (resample::SIGNATURE, resample_op),
    (tonemap::SIGNATURE, tonemap_op),
    (shader::SIGNATURE, shader_op),
];

/// Where the plugin's filters get registered.
pub trait PluginRegistry {
    fn configure(&mut self, info: &PluginInfo);
    fn register(&mut self, signature: &FilterSignature, constructor: Constructor);
}

/// Register the plugin identity and all filters with `registry`.
pub fn plugin_init(registry: &mut dyn PluginRegistry) {
    registry.configure(&PLUGIN_INFO);
    for (signature, constructor) in &FILTERS {
        log::debug!(
            "Registering {}.{}({})",
            PLUGIN_INFO.namespace,
            signature.name,
            signature.to_signature_string()
        );
        registry.register(signature, *constructor);
    }
}

/// Find a filter by its registered name.
pub fn lookup(name: &str) -> Option<(FilterSignature, Constructor)> {
    FILTERS.iter().copied().find(|(sig, _)| sig.name == name)
}

fn parse_args<T: DeserializeOwned>(
    signature: &FilterSignature,
    args: &FilterArgs,
) -> Result<T, FilterError> {
    signature.check_args(args)?;
    serde_json::from_value(Value::Object(args.clone())).map_err(|source| {
        FilterError::Arguments {
            filter: signature.name,
            source,
        }
    })
}

pub fn deband_op(args: &FilterArgs) -> Result<FilterOp, FilterError> {
    let params: DebandParams = parse_args(&deband::SIGNATURE, args)?;
    params.validate()?;
    Ok(FilterOp::Deband(params))
}

pub fn resample_op(args: &FilterArgs) -> Result<FilterOp, FilterError> {
    let params: ResampleParams = parse_args(&resample::SIGNATURE, args)?;
    params.validate()?;
    Ok(FilterOp::Resample(params))
}

pub fn tonemap_op(args: &FilterArgs) -> Result<FilterOp, FilterError> {
    let params: TonemapParams = parse_args(&tonemap::SIGNATURE, args)?;
    params.validate()?;
    Ok(FilterOp::Tonemap(params))
}

pub fn shader_op(args: &FilterArgs) -> Result<FilterOp, FilterError> {
    let params: ShaderParams = parse_args(&shader::SIGNATURE, args)?;
    Ok(FilterOp::Shader(ShaderProgram::from_params(&params)?))
}

/// A filter instance as the host sees it.
pub trait FrameFilter: Send {
    fn name(&self) -> &'static str;

    /// Layout of the frames this filter produces from `input`.
    fn output_layout(&self, input: &ImageLayout) -> anyhow::Result<ImageLayout>;

    /// Render frame `n` of `src` into `dst`.
    fn process_frame(&mut self, n: u64, src: &Image<'_>, dst: &mut ImageMut<'_>)
        -> anyhow::Result<()>;
}

/// A [`FilterOp`] bound to its own GPU context.
pub struct BridgeFilter<A: GpuApi> {
    op: FilterOp,
    ctx: Context<A>,
}

impl<A: GpuApi> BridgeFilter<A> {
    /// Initialize a context on `api` for `op`.
    pub fn new(op: FilterOp, api: A, config: BridgeConfig) -> anyhow::Result<Self> {
        Self::with_legacy_context(op, api, config, &mut NoLegacyContext)
    }

    /// Like [`new`](Self::new), with `legacy` made current around backends
    /// that ask for one.
    pub fn with_legacy_context(
        op: FilterOp,
        api: A,
        config: BridgeConfig,
        legacy: &mut dyn LegacyContext,
    ) -> anyhow::Result<Self> {
        let mut ctx = Context::new(api, config);
        ctx.init(legacy)
            .with_context(|| format!("{}: failed initializing GPU context", op.name()))?;
        Ok(Self { op, ctx })
    }

    pub fn op(&self) -> &FilterOp {
        &self.op
    }

    pub fn context(&self) -> &Context<A> {
        &self.ctx
    }
}

impl BridgeFilter<WgpuApi> {
    pub fn with_wgpu(op: FilterOp, config: BridgeConfig) -> anyhow::Result<Self> {
        let api = WgpuApi::new(&config);
        Self::new(op, api, config)
    }
}

impl<A: GpuApi> FrameFilter for BridgeFilter<A> {
    fn name(&self) -> &'static str {
        self.op.name()
    }

    fn output_layout(&self, input: &ImageLayout) -> anyhow::Result<ImageLayout> {
        self.op
            .output_layout(input)
            .with_context(|| format!("{}: unsupported input", self.name()))
    }

    fn process_frame(
        &mut self,
        n: u64,
        src: &Image<'_>,
        dst: &mut ImageMut<'_>,
    ) -> anyhow::Result<()> {
        let name = self.op.name();
        self.ctx
            .process(&self.op, src, dst)
            .with_context(|| format!("{name}: failed processing frame {n}"))
    }
}

/// Build a filter by name from host arguments, on the wgpu backend.
pub fn create_filter(
    name: &str,
    args: &FilterArgs,
    config: BridgeConfig,
) -> anyhow::Result<Box<dyn FrameFilter>> {
    let (_, constructor) =
        lookup(name).with_context(|| format!("no filter named {name} in this plugin"))?;
    let op = constructor(args)?;
    Ok(Box::new(BridgeFilter::with_wgpu(op, config)?))
}
