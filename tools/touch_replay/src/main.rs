use std::{
    cell::RefCell,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    process,
    rc::Rc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use forcetouch::{
    DispatchCallback, GestureConfig, GestureEngine, GestureKind, MotionAction, PointerId,
    PointerSample, RawEvent, TimerQueue, ToolType,
};
use log::info;

const TRACE_TAG: &str = "force_trace";
const POINTER_COLUMNS: usize = 6;

#[derive(Debug, Parser)]
#[command(name = "touch_replay")]
#[command(about = "Replay a recorded force touch trace through the gesture engine")]
struct Cli {
    /// CSV trace: force_trace,ms,action,index,(id,tool,x,y,pressure,size)+
    trace: PathBuf,
    /// Gesture config TOML; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Expected output kinds, one per line.
    #[arg(long)]
    expect: Option<PathBuf>,
    #[arg(long)]
    accept_tap: bool,
    #[arg(long)]
    accept_long_press: bool,
    #[arg(long)]
    refuse_begin: bool,
    /// Keep firing timers this long after the last sample.
    #[arg(long, default_value_t = 1_000)]
    settle_ms: u64,
}

#[derive(Clone, Debug)]
struct ReplayLine {
    ms: u64,
    kind: &'static str,
    x: f32,
    y: f32,
    pointer: Option<PointerId>,
}

#[derive(Clone, Default)]
struct ReplayHost {
    lines: Rc<RefCell<Vec<ReplayLine>>>,
    now_ms: Rc<RefCell<u64>>,
    accept_tap: bool,
    accept_long_press: bool,
    refuse_begin: bool,
}

impl ReplayHost {
    fn push(&self, kind: &'static str, x: f32, y: f32, pointer: Option<PointerId>) {
        let ms = *self.now_ms.borrow();
        self.lines.borrow_mut().push(ReplayLine {
            ms,
            kind,
            x,
            y,
            pointer,
        });
    }

    fn gesture(&self, kind: GestureKind, x: f32, y: f32, pointer: Option<PointerId>) {
        self.push(gesture_label(kind), x, y, pointer);
    }
}

impl DispatchCallback for ReplayHost {
    fn deliver_to_host(&mut self, event: &RawEvent) -> bool {
        let (x, y, pointer) = event
            .action_pointer()
            .map_or((0.0, 0.0, None), |pointer| {
                (pointer.x, pointer.y, Some(pointer.id))
            });
        self.lines.borrow_mut().push(ReplayLine {
            ms: event.event_ms,
            kind: action_label(event.action),
            x,
            y,
            pointer,
        });
        false
    }

    fn on_gesture_begin(&mut self, x: f32, y: f32, pointer: PointerId) -> bool {
        self.gesture(GestureKind::Begin, x, y, Some(pointer));
        !self.refuse_begin
    }

    fn on_gesture_additional(&mut self, x: f32, y: f32, pointer: PointerId) -> bool {
        self.gesture(GestureKind::Additional, x, y, Some(pointer));
        true
    }

    fn on_gesture_end(&mut self, x: f32, y: f32, pointer: PointerId) -> bool {
        self.gesture(GestureKind::End, x, y, Some(pointer));
        true
    }

    fn on_gesture_finish(&mut self, x: f32, y: f32) -> bool {
        self.gesture(GestureKind::Finish, x, y, None);
        true
    }

    fn on_gesture_cancel(&mut self, x: f32, y: f32) -> bool {
        self.gesture(GestureKind::Cancel, x, y, None);
        true
    }

    fn on_long_press(&mut self, x: f32, y: f32) -> bool {
        if self.accept_long_press {
            self.gesture(GestureKind::LongPress, x, y, None);
        }
        self.accept_long_press
    }

    fn on_tap(&mut self, x: f32, y: f32) -> bool {
        if self.accept_tap {
            self.gesture(GestureKind::Tap, x, y, None);
        }
        self.accept_tap
    }
}

fn main() {
    let _ = env_logger::try_init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => GestureConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GestureConfig::default(),
    };
    let events = parse_trace(&cli.trace)?;
    info!("replaying {} events from {}", events.len(), cli.trace.display());

    let host = ReplayHost {
        accept_tap: cli.accept_tap,
        accept_long_press: cli.accept_long_press,
        refuse_begin: cli.refuse_begin,
        ..ReplayHost::default()
    };
    let timers = TimerQueue::new();
    let mut engine = GestureEngine::new(config, host.clone(), timers.clone())?;

    let mut last_ms = 0;
    for event in events {
        fire_due(&mut engine, &timers, &host, event.event_ms);
        last_ms = event.event_ms;
        *host.now_ms.borrow_mut() = last_ms;
        engine.on_touch_event(event);
    }
    fire_due(&mut engine, &timers, &host, last_ms.saturating_add(cli.settle_ms));

    let lines = host.lines.borrow();
    println!("event,ms,kind,x,y,pointer");
    for line in lines.iter() {
        let pointer = line.pointer.map(|id| id.to_string()).unwrap_or_default();
        println!(
            "event,{},{},{},{},{}",
            line.ms, line.kind, line.x, line.y, pointer
        );
    }

    let decisions = engine.decisions();
    info!(
        "{} decisions recorded{}",
        decisions.len(),
        if decisions.overflowed() {
            " (oldest dropped)"
        } else {
            ""
        }
    );

    if let Some(expect_path) = &cli.expect {
        let expected = parse_expected_kinds(expect_path)?;
        let actual: Vec<&'static str> = lines.iter().map(|line| line.kind).collect();
        if actual != expected {
            eprintln!("expected kinds: {}", expected.join(","));
            eprintln!("actual kinds:   {}", actual.join(","));
            bail!("event sequence mismatch");
        }
    }

    Ok(())
}

fn fire_due(engine: &mut GestureEngine, timers: &TimerQueue, host: &ReplayHost, now_ms: u64) {
    while let Some((token, deadline_ms)) = timers.pop_due(now_ms) {
        *host.now_ms.borrow_mut() = deadline_ms;
        engine.on_timer(token, deadline_ms);
    }
}

fn parse_trace(path: &Path) -> Result<Vec<RawEvent>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line =
            line_result.with_context(|| format!("failed to read {}:{line_no}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts[0] != TRACE_TAG || parts.get(1) == Some(&"ms") {
            continue;
        }
        let event = parse_event(&parts)
            .with_context(|| format!("{}:{line_no} invalid trace line", path.display()))?;
        out.push(event);
    }

    Ok(out)
}

fn parse_event(parts: &[&str]) -> Result<RawEvent> {
    let pointer_fields = parts.get(4..).unwrap_or_default();
    if parts.len() < 4 + POINTER_COLUMNS || pointer_fields.len() % POINTER_COLUMNS != 0 {
        bail!(
            "expected 4 header columns plus groups of {POINTER_COLUMNS} pointer columns, got {}",
            parts.len()
        );
    }

    let ms = parts[1].parse::<u64>().context("ms")?;
    let action = parse_action(parts[2])?;
    let index = parts[3].parse::<usize>().context("index")?;
    let pointers = pointer_fields
        .chunks(POINTER_COLUMNS)
        .map(parse_pointer)
        .collect::<Result<Vec<_>>>()?;
    if index >= pointers.len() {
        bail!("action index {index} out of range for {} pointers", pointers.len());
    }

    Ok(RawEvent::new(action, ms, pointers).with_action_index(index))
}

fn parse_pointer(fields: &[&str]) -> Result<PointerSample> {
    let id = fields[0].parse::<PointerId>().context("pointer id")?;
    let tool = parse_tool(fields[1])?;
    let x = fields[2].parse::<f32>().context("x")?;
    let y = fields[3].parse::<f32>().context("y")?;
    let pressure = fields[4].parse::<f32>().context("pressure")?;
    let size = fields[5].parse::<f32>().context("size")?;
    Ok(PointerSample::finger(id, x, y, pressure)
        .with_size(size)
        .with_tool(tool))
}

fn parse_action(raw: &str) -> Result<MotionAction> {
    match raw.to_ascii_lowercase().as_str() {
        "down" => Ok(MotionAction::Down),
        "pointer_down" => Ok(MotionAction::PointerDown),
        "move" => Ok(MotionAction::Move),
        "pointer_up" => Ok(MotionAction::PointerUp),
        "up" => Ok(MotionAction::Up),
        "cancel" => Ok(MotionAction::Cancel),
        other => Err(anyhow!("unknown action '{other}'")),
    }
}

fn parse_tool(raw: &str) -> Result<ToolType> {
    match raw.to_ascii_lowercase().as_str() {
        "finger" => Ok(ToolType::Finger),
        "stylus" => Ok(ToolType::Stylus),
        "mouse" => Ok(ToolType::Mouse),
        "eraser" => Ok(ToolType::Eraser),
        "unknown" => Ok(ToolType::Unknown),
        other => Err(anyhow!("unknown tool '{other}'")),
    }
}

fn parse_expected_kinds(path: &Path) -> Result<Vec<&'static str>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut kinds = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line =
            line_result.with_context(|| format!("failed to read {}:{line_no}", path.display()))?;
        let token = line.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }

        let kind = normalize_kind(token).ok_or_else(|| {
            anyhow!(
                "{}:{line_no} invalid expected event kind: {token}",
                path.display()
            )
        })?;
        kinds.push(kind);
    }

    Ok(kinds)
}

fn normalize_kind(kind: &str) -> Option<&'static str> {
    const KINDS: [&str; 13] = [
        "down",
        "pointer_down",
        "move",
        "pointer_up",
        "up",
        "cancel",
        "begin",
        "additional",
        "end",
        "finish",
        "gesture_cancel",
        "long_press",
        "tap",
    ];
    let kind = kind.to_ascii_lowercase();
    KINDS.into_iter().find(|known| *known == kind)
}

fn action_label(action: MotionAction) -> &'static str {
    match action {
        MotionAction::Down => "down",
        MotionAction::PointerDown => "pointer_down",
        MotionAction::Move => "move",
        MotionAction::PointerUp => "pointer_up",
        MotionAction::Up => "up",
        MotionAction::Cancel => "cancel",
    }
}

// Host cancels and gesture cancels share a name in the engine, not here.
fn gesture_label(kind: GestureKind) -> &'static str {
    match kind {
        GestureKind::Cancel => "gesture_cancel",
        other => other.as_str(),
    }
}
