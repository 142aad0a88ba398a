use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gnuplot_viewer::data::formats::{EncoderRegistry, ExportFormat};
use gnuplot_viewer::events::{RenderJobId, RenderOutcome, WorkflowEvent};
use gnuplot_viewer::{
    OpenIntent, PlotWorkflow, Renderer, SubprocessError, WorkflowError, WorkflowOptions,
    WorkflowState,
};
use image::{ImageFormat, Rgba, RgbaImage};

const WAIT: Duration = Duration::from_secs(5);

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Counters shared with the fake renderer.
#[derive(Default)]
struct RenderStats {
    runs: AtomicUsize,
    running: AtomicUsize,
    overlapped: AtomicBool,
}

/// Renders a solid image whose size is read from the first two numbers of
/// the script, e.g. a script containing `40 30` yields a 40x30 bitmap. A
/// script mentioning `slow` takes 150 ms before writing its output.
fn sizing_renderer(out_dir: PathBuf, fail: Arc<AtomicBool>, stats: Arc<RenderStats>) -> Arc<dyn Renderer> {
    Arc::new(move |script: &Path| -> Result<PathBuf, WorkflowError> {
        stats.runs.fetch_add(1, Ordering::SeqCst);
        if stats.running.fetch_add(1, Ordering::SeqCst) > 0 {
            stats.overlapped.store(true, Ordering::SeqCst);
        }
        let result = render_sized(&out_dir, &fail, script);
        stats.running.fetch_sub(1, Ordering::SeqCst);
        result
    })
}

fn render_sized(out_dir: &Path, fail: &AtomicBool, script: &Path) -> Result<PathBuf, WorkflowError> {
    if fail.load(Ordering::SeqCst) {
        return Err(SubprocessError::Exit {
            program: "gnuplot".into(),
            code: Some(1),
            stderr: "line 1: invalid command".into(),
        }
        .into());
    }
    let text = std::fs::read_to_string(script).map_err(|source| WorkflowError::FileUnavailable {
        path: script.to_path_buf(),
        source,
    })?;
    if text.contains("slow") {
        std::thread::sleep(Duration::from_millis(150));
    }
    let mut nums = text.split_whitespace().filter_map(|t| t.parse::<u32>().ok());
    let (w, h) = (nums.next().unwrap_or(8), nums.next().unwrap_or(6));
    let out = out_dir.join("outpic.png");
    RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))
        .save(&out)
        .map_err(|source| WorkflowError::Encode {
            path: out.clone(),
            source,
        })?;
    Ok(out)
}

struct Fixture {
    dir: tempfile::TempDir,
    fail: Arc<AtomicBool>,
    stats: Arc<RenderStats>,
    wf: PlotWorkflow,
}

fn fixture_with_registry(registry: EncoderRegistry) -> Fixture {
    init_logs();
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("render");
    std::fs::create_dir(&out_dir).unwrap();
    let fail = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(RenderStats::default());
    let wf = PlotWorkflow::with_options(
        sizing_renderer(out_dir, fail.clone(), stats.clone()),
        registry,
        WorkflowOptions {
            watch_interval: Duration::from_millis(20),
        },
    );
    Fixture { dir, fail, stats, wf }
}

fn fixture() -> Fixture {
    fixture_with_registry(EncoderRegistry::installed().clone())
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, body).unwrap();
    p
}

/// Pump events until `pred` holds or the deadline passes.
fn wait_until(wf: &mut PlotWorkflow, pred: impl Fn(&PlotWorkflow) -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while !pred(&*wf) {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        wf.process_events_timeout((deadline - now).min(Duration::from_millis(50)));
    }
    true
}

fn png_format() -> ExportFormat {
    ExportFormat::for_image_format(ImageFormat::Png).unwrap()
}

#[test]
fn rendered_script_is_displayed() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "40 30");

    fx.wf.request_new_plot().unwrap();
    assert_eq!(fx.wf.state(), WorkflowState::AwaitingScriptSelection);
    fx.wf.script_chosen(&script).unwrap();
    assert_eq!(fx.wf.state(), WorkflowState::Rendering);

    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Displaying);
    let img = fx.wf.image().expect("image after render");
    assert_eq!(img.dimensions(), (40, 30));

    let on_disk = image::open(fx.dir.path().join("render/outpic.png")).unwrap().into_rgba8();
    assert_eq!(img.pixels(), &on_disk);
    assert!(fx.wf.last_error().is_none());
}

#[test]
fn failed_render_from_idle_returns_to_idle() {
    let mut fx = fixture();
    fx.fail.store(true, Ordering::SeqCst);
    let script = write_script(fx.dir.path(), "broken.gp", "plot sin(");

    fx.wf.script_chosen(&script).unwrap();
    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Idle);
    assert!(fx.wf.image().is_none());
    assert!(matches!(
        fx.wf.last_error(),
        Some(WorkflowError::SubprocessFailure(SubprocessError::Exit { code: Some(1), .. }))
    ));
    let notice = fx.wf.latest_notice().expect("failure is surfaced");
    assert!(notice.message.contains("invalid command"));
}

#[test]
fn failed_render_keeps_previous_image() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "12 7");
    fx.wf.script_chosen(&script).unwrap();
    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Displaying);
    let before = fx.wf.image().unwrap().pixels().clone();
    let revision = fx.wf.image_revision();

    fx.fail.store(true, Ordering::SeqCst);
    fx.wf.reload().unwrap();
    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Displaying);
    assert_eq!(fx.wf.image().unwrap().pixels(), &before);
    assert_eq!(fx.wf.image_revision(), revision);
    assert!(fx.wf.last_error().is_some());
}

#[test]
fn missing_script_is_reported_without_watch() {
    let mut fx = fixture();
    fx.wf.request_new_plot().unwrap();
    let err = fx.wf.script_chosen(&fx.dir.path().join("nope.gp")).unwrap_err();
    assert!(matches!(err, WorkflowError::FileUnavailable { .. }));
    assert_eq!(fx.wf.state(), WorkflowState::Idle);
    assert!(fx.wf.watched_path().is_none());
    assert_eq!(fx.stats.runs.load(Ordering::SeqCst), 0);
}

#[test]
fn choosing_a_second_script_replaces_the_watch() {
    let mut fx = fixture();
    let s1 = write_script(fx.dir.path(), "one.gp", "10 10");
    let s2 = write_script(fx.dir.path(), "two.gp", "20 20");

    fx.wf.script_chosen(&s1).unwrap();
    fx.wf.wait_for_render(WAIT);
    let first_token = fx.wf.watch_token().unwrap();
    fx.wf.script_chosen(&s2).unwrap();
    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Displaying);

    assert_eq!(
        fx.wf.watched_path(),
        Some(std::fs::canonicalize(&s2).unwrap().as_path())
    );
    assert_ne!(fx.wf.watch_token(), Some(first_token));

    // Changes to the old script no longer trigger anything.
    let runs = fx.stats.runs.load(Ordering::SeqCst);
    std::fs::write(&s1, "30 30 and then some").unwrap();
    std::thread::sleep(Duration::from_millis(200));
    fx.wf.process_events();
    assert_eq!(fx.wf.state(), WorkflowState::Displaying);
    assert_eq!(fx.stats.runs.load(Ordering::SeqCst), runs);
    assert_eq!(fx.wf.image().unwrap().dimensions(), (20, 20));
}

#[test]
fn edited_script_is_rendered_again() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "16 9");
    fx.wf.script_chosen(&script).unwrap();
    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Displaying);
    assert_eq!(fx.wf.image().unwrap().dimensions(), (16, 9));

    std::fs::write(&script, "64 48 # bigger").unwrap();
    assert!(wait_until(&mut fx.wf, |wf| {
        wf.state() == WorkflowState::Displaying
            && wf.image().map(|i| i.dimensions()) == Some((64, 48))
    }));
}

#[test]
fn removed_script_does_not_trigger_render() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "5 5");
    fx.wf.script_chosen(&script).unwrap();
    fx.wf.wait_for_render(WAIT);
    let runs = fx.stats.runs.load(Ordering::SeqCst);

    std::fs::remove_file(&script).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    fx.wf.process_events();
    assert_eq!(fx.wf.state(), WorkflowState::Displaying);
    assert_eq!(fx.stats.runs.load(Ordering::SeqCst), runs);
}

#[test]
fn change_while_exporting_is_rendered_afterwards() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "4 4");
    fx.wf.script_chosen(&script).unwrap();
    fx.wf.wait_for_render(WAIT);

    assert!(fx.wf.export_format_chosen(png_format()));
    std::fs::write(&script, "8 8 changed").unwrap();
    std::thread::sleep(Duration::from_millis(200));
    fx.wf.process_events();
    assert_eq!(fx.wf.state(), WorkflowState::AwaitingExportTarget);

    fx.wf.export_cancelled();
    assert_eq!(fx.wf.state(), WorkflowState::Rendering);
    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Displaying);
    assert_eq!(fx.wf.image().unwrap().dimensions(), (8, 8));
}

#[test]
fn only_the_first_export_format_is_kept() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "30 20");
    fx.wf.script_chosen(&script).unwrap();
    fx.wf.wait_for_render(WAIT);

    let jpeg = ExportFormat::for_image_format(ImageFormat::Jpeg).unwrap();
    assert!(fx.wf.export_format_chosen(png_format()));
    assert!(!fx.wf.export_format_chosen(jpeg));
    assert_eq!(fx.wf.pending_export(), Some(&png_format()));

    let out_dir = fx.dir.path().join("exports");
    std::fs::create_dir(&out_dir).unwrap();
    let receipt = fx.wf.export_target_chosen(&out_dir, "figure").unwrap();
    assert_eq!(receipt.path, out_dir.join("figure.png"));
    assert_eq!(receipt.media_type, "image/png");
    assert_eq!(fx.wf.state(), WorkflowState::Displaying);
    assert!(fx.wf.pending_export().is_none());

    let decoded = image::open(&receipt.path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (30, 20));
}

#[test]
fn export_without_installed_encoder_fails() {
    let mut fx = fixture_with_registry(EncoderRegistry::from_formats([ImageFormat::Png]));
    let script = write_script(fx.dir.path(), "plot.gp", "3 3");
    fx.wf.script_chosen(&script).unwrap();
    fx.wf.wait_for_render(WAIT);

    let bmp = ExportFormat::for_image_format(ImageFormat::Bmp).unwrap();
    assert!(fx.wf.export_format_chosen(bmp));
    let err = fx.wf.export_target_chosen(fx.dir.path(), "plot.bmp").unwrap_err();
    assert!(matches!(err, WorkflowError::EncoderUnavailable { .. }));
    assert_eq!(fx.wf.state(), WorkflowState::Displaying);
    assert!(!fx.dir.path().join("plot.bmp").exists());
}

#[test]
fn export_format_is_ignored_without_image() {
    let mut fx = fixture();
    assert!(!fx.wf.export_format_chosen(png_format()));
    assert_eq!(fx.wf.state(), WorkflowState::Idle);
}

#[test]
fn image_is_displayed_without_rendering() {
    let mut fx = fixture();
    let img_path = fx.dir.path().join("ready.png");
    RgbaImage::from_pixel(9, 4, Rgba([1, 2, 3, 255])).save(&img_path).unwrap();

    fx.wf.request_image_load().unwrap();
    assert_eq!(fx.wf.state(), WorkflowState::AwaitingImageSelection);
    fx.wf.open(OpenIntent::Display(img_path)).unwrap();
    assert_eq!(fx.wf.state(), WorkflowState::Displaying);
    assert_eq!(fx.wf.image().unwrap().dimensions(), (9, 4));
    assert!(fx.wf.source_path().is_none());
    assert_eq!(fx.stats.runs.load(Ordering::SeqCst), 0);
}

#[test]
fn undecodable_image_keeps_state() {
    let mut fx = fixture();
    let bogus = write_script(fx.dir.path(), "bogus.png", "not a png");
    fx.wf.request_image_load().unwrap();
    let err = fx.wf.image_chosen(&bogus).unwrap_err();
    assert!(matches!(err, WorkflowError::Decode { .. }));
    assert_eq!(fx.wf.state(), WorkflowState::Idle);
}

#[test]
fn cancelled_chooser_returns_to_stable_state() {
    let mut fx = fixture();
    fx.wf.request_new_plot().unwrap();
    assert!(matches!(
        fx.wf.request_image_load(),
        Err(WorkflowError::InvalidState { .. })
    ));
    fx.wf.selection_cancelled();
    assert_eq!(fx.wf.state(), WorkflowState::Idle);
}

#[test]
fn stale_render_results_are_discarded() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "6 6");
    fx.wf.script_chosen(&script).unwrap();
    fx.wf.wait_for_render(WAIT);
    let revision = fx.wf.image_revision();

    let stray = fx.dir.path().join("stray.png");
    RgbaImage::new(99, 99).save(&stray).unwrap();
    fx.wf.handle_event(WorkflowEvent::RenderFinished(RenderOutcome {
        job: RenderJobId(9999),
        script: script.clone(),
        result: Ok(stray),
    }));
    assert_eq!(fx.wf.image_revision(), revision);
    assert_eq!(fx.wf.image().unwrap().dimensions(), (6, 6));
}

#[test]
fn shutdown_releases_the_watch() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "2 2");
    fx.wf.script_chosen(&script).unwrap();
    fx.wf.wait_for_render(WAIT);
    assert!(fx.wf.watched_path().is_some());

    fx.wf.shutdown();
    assert!(fx.wf.watched_path().is_none());
    std::fs::write(&script, "4 4 changed").unwrap();
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(fx.wf.process_events(), 0);
}

fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let p = dir.join(name);
    RgbaImage::from_pixel(w, h, Rgba([1, 2, 3, 255])).save(&p).unwrap();
    p
}

#[test]
fn script_chosen_while_rendering_shows_the_newer_script() {
    let mut fx = fixture();
    let slow = write_script(fx.dir.path(), "a.gp", "10 10 slow");
    let fast = write_script(fx.dir.path(), "b.gp", "20 20");

    fx.wf.script_chosen(&slow).unwrap();
    fx.wf.script_chosen(&fast).unwrap();
    assert_eq!(fx.wf.state(), WorkflowState::Rendering);

    // A frame that lands after the slow job has finished.
    std::thread::sleep(Duration::from_millis(300));
    fx.wf.process_events();

    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Displaying);
    assert_eq!(fx.wf.image().unwrap().dimensions(), (20, 20));
    assert_eq!(fx.wf.image_revision(), 1);
    assert_eq!(
        fx.wf.source_path(),
        Some(std::fs::canonicalize(&fast).unwrap().as_path())
    );
    assert_eq!(fx.stats.runs.load(Ordering::SeqCst), 2);
    assert!(!fx.stats.overlapped.load(Ordering::SeqCst));
}

#[test]
fn image_chosen_during_render_is_kept() {
    let mut fx = fixture();
    let slow = write_script(fx.dir.path(), "a.gp", "10 10 slow");
    let img = write_png(fx.dir.path(), "ready.png", 9, 4);

    fx.wf.script_chosen(&slow).unwrap();
    fx.wf.image_chosen(&img).unwrap();
    assert_eq!(fx.wf.state(), WorkflowState::Displaying);
    let revision = fx.wf.image_revision();

    std::thread::sleep(Duration::from_millis(300));
    fx.wf.process_events();
    assert_eq!(fx.wf.state(), WorkflowState::Displaying);
    assert_eq!(fx.wf.image().unwrap().dimensions(), (9, 4));
    assert_eq!(fx.wf.image_revision(), revision);
}

#[test]
fn script_after_interrupted_render_waits_for_the_renderer() {
    let mut fx = fixture();
    let slow = write_script(fx.dir.path(), "a.gp", "10 10 slow");
    let fast = write_script(fx.dir.path(), "b.gp", "20 20");
    let img = write_png(fx.dir.path(), "ready.png", 9, 4);

    fx.wf.script_chosen(&slow).unwrap();
    fx.wf.image_chosen(&img).unwrap();
    fx.wf.script_chosen(&fast).unwrap();
    assert_eq!(fx.wf.state(), WorkflowState::Rendering);

    assert_eq!(fx.wf.wait_for_render(WAIT), WorkflowState::Displaying);
    assert_eq!(fx.wf.image().unwrap().dimensions(), (20, 20));
    assert!(!fx.stats.overlapped.load(Ordering::SeqCst));
}

#[test]
fn export_dropped_by_a_new_image_ignores_the_late_target() {
    let mut fx = fixture();
    let script = write_script(fx.dir.path(), "plot.gp", "6 6");
    fx.wf.script_chosen(&script).unwrap();
    fx.wf.wait_for_render(WAIT);

    assert!(fx.wf.export_format_chosen(png_format()));
    assert!(fx.wf.accepts_export_target());
    let img = write_png(fx.dir.path(), "ready.png", 3, 3);
    fx.wf.image_chosen(&img).unwrap();
    assert!(!fx.wf.accepts_export_target());
    assert!(fx.wf.pending_export().is_none());

    let err = fx.wf.export_target_chosen(fx.dir.path(), "late").unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState { .. }));
    assert!(!fx.dir.path().join("late.png").exists());
    assert_eq!(fx.wf.state(), WorkflowState::Displaying);
}
