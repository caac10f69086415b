use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "framesync", version)]
struct Cli {
    /// JSON config file; command-line flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve frames of a scene script and reload it on every edit.
    Serve(ServeArgs),
    /// Load a scene script once and print its description as JSON.
    Describe(SceneArgs),
    /// Load a scene script once and print the response to a single frame request.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct SceneArgs {
    /// Scene script (JSON).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Root that image paths are reported relative to.
    #[arg(long)]
    assets_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<String>,

    /// Address of a running renderer.
    #[arg(long)]
    renderer_addr: Option<String>,

    /// Renderer executable launched when none is listening.
    #[arg(long)]
    renderer_path: Option<PathBuf>,

    /// RPC worker threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Emit JSON logs.
    #[arg(long)]
    json_logs: bool,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Segment index.
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Offset in seconds into the segment.
    #[arg(long, default_value_t = 0.0)]
    offset: f64,

    /// Exclusive end of the segment range; 0 plays every segment.
    #[arg(long, default_value_t = 0)]
    end: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let opts = match &cli.config {
        Some(path) => framesync::ServeOpts::from_json_file(path)?,
        None => framesync::ServeOpts::default(),
    };
    match cli.cmd {
        Command::Serve(args) => cmd_serve(opts, args),
        Command::Describe(args) => cmd_describe(opts, args),
        Command::Frame(args) => cmd_frame(opts, args),
    }
}

fn apply_scene_args(opts: &mut framesync::ServeOpts, args: &SceneArgs) {
    if let Some(dir) = &args.assets_dir {
        opts.assets_dir = dir.clone();
    }
}

fn make_service(opts: &framesync::ServeOpts, script: &Path) -> Arc<framesync::FrameService> {
    let source = Arc::new(framesync::ScriptSource::new(script));
    Arc::new(framesync::FrameService::new(
        source,
        opts.service_opts(),
        Arc::new(opts.renderer_link()),
        opts.launcher(),
    ))
}

fn cmd_serve(mut opts: framesync::ServeOpts, args: ServeArgs) -> anyhow::Result<()> {
    apply_scene_args(&mut opts, &args.scene);
    if let Some(addr) = args.addr {
        opts.frame_server_addr = addr;
    }
    if let Some(addr) = args.renderer_addr {
        opts.renderer_addr = addr;
    }
    if let Some(path) = args.renderer_path {
        opts.renderer_path = Some(path);
    }
    if let Some(n) = args.workers {
        opts.workers = n;
    }
    if args.json_logs {
        opts.logging.json = true;
    }
    opts.validate()?;
    framesync::init_logging(&opts.logging);

    let service = make_service(&opts, &args.scene.in_path);
    let outcome = service.start();
    tracing::info!(?outcome, status = ?service.status(), "initial load finished");
    if !service.is_accepting() {
        return Ok(());
    }

    let server = framesync::RpcServer::bind(
        &opts.frame_server_addr,
        opts.workers,
        Arc::clone(&service),
    )
    .with_context(|| format!("start frame server on '{}'", opts.frame_server_addr))?;
    let _watcher = framesync::SceneWatcher::spawn(Arc::clone(&service), opts.debounce())
        .context("start scene watcher")?;
    server.run()?;
    Ok(())
}

fn load_once(
    opts: &framesync::ServeOpts,
    args: &SceneArgs,
) -> anyhow::Result<Arc<framesync::FrameService>> {
    let service = make_service(opts, &args.in_path);
    service
        .load_scene_program()
        .with_context(|| format!("load scene '{}'", args.in_path.display()))?;
    Ok(service)
}

fn cmd_describe(mut opts: framesync::ServeOpts, args: SceneArgs) -> anyhow::Result<()> {
    apply_scene_args(&mut opts, &args);
    let service = load_once(&opts, &args)?;
    let data = service.fetch_scene_data();
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

fn cmd_frame(mut opts: framesync::ServeOpts, args: FrameArgs) -> anyhow::Result<()> {
    apply_scene_args(&mut opts, &args.scene);
    let service = load_once(&opts, &args.scene)?;
    let frame = service.get_frame_at_time(framesync::FrameRequest {
        animation_index: args.index,
        animation_offset: args.offset,
        end_index: args.end,
        first_request: true,
    })?;
    println!("{}", serde_json::to_string_pretty(&frame)?);
    Ok(())
}
