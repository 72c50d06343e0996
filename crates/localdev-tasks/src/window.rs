//! Bounded live output window
//!
//! An [`OutputWindow`] owns a fixed-height region of the terminal. Producers only
//! ever send text lines through a [`LineSender`]; a single consumer task owns the
//! writer and is the only code that emits cursor movement for the region. Closing
//! the window erases the whole region and waits for the consumer to finish, so the
//! next window never overlaps this one.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use console::{pad_str, style, Alignment, Term};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use localdev_core::config::DisplayConfig;

/// Move the cursor up one line and clear it
pub const CLEAR_LINE_UP: &str = "\x1b[1A\x1b[K";

/// Lines of chrome around the rows: title, top border, bottom border
const FRAME_LINES: usize = 3;

/// Columns of chrome around each row: `│ ` and ` │`
const FRAME_COLS: usize = 4;

/// Channel end used by producers to feed a window
pub type LineSender = mpsc::UnboundedSender<String>;

/// Builds a fresh writer for every window
pub type WriterFactory = Arc<dyn Fn() -> Box<dyn Write + Send> + Send + Sync>;

/// Window geometry and timing
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Title shown above the frame
    pub title: String,
    /// Number of visible rows (K)
    pub lines: usize,
    /// Columns kept free at the right edge
    pub margin: usize,
    /// Spaces per tab
    pub tab_width: usize,
    /// Terminal width; detected when `None`
    pub width: Option<usize>,
    /// Pause after erasing
    pub settle: Duration,
    /// Never draw; lines are only logged
    pub headless: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for WindowConfig {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            title: String::new(),
            lines: display.lines.max(1),
            margin: display.margin,
            tab_width: display.tab_width,
            width: display.width,
            settle: display.settle(),
            headless: false,
        }
    }
}

impl WindowConfig {
    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the number of rows
    pub fn with_lines(mut self, lines: usize) -> Self {
        self.lines = lines.max(1);
        self
    }

    /// Use a fixed terminal width
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the pause after erasing
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Do not draw anything
    pub fn with_headless(mut self) -> Self {
        self.headless = true;
        self
    }

    fn resolved_width(&self) -> Option<usize> {
        if self.headless {
            return None;
        }
        self.width
            .or_else(|| Term::stdout().size_checked().map(|(_, cols)| cols as usize))
    }
}

/// Fixed-capacity FIFO of the most recent lines
#[derive(Debug, Clone)]
pub struct DisplayWindow {
    capacity: usize,
    lines: VecDeque<String>,
}

impl DisplayWindow {
    /// Create an empty window holding at most `capacity` lines
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a line, evicting the oldest one when full
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Maximum number of lines
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lines currently held
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no line has been pushed yet
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line at row `i`, oldest first
    pub fn get(&self, i: usize) -> Option<&str> {
        self.lines.get(i).map(String::as_str)
    }

    /// Copy of the visible lines, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// Turn raw producer output into displayable lines
///
/// Strips ANSI sequences, splits embedded newlines, expands tabs and truncates
/// each line to `max_width` columns when given.
pub fn clean_line(raw: &str, tab_width: usize, max_width: Option<usize>) -> Vec<String> {
    let stripped = console::strip_ansi_codes(raw);
    let tab = " ".repeat(tab_width);

    stripped
        .split('\n')
        .map(|line| {
            let line = line.trim_end_matches('\r').replace('\t', &tab);
            match max_width {
                Some(width) => console::truncate_str(&line, width, "").into_owned(),
                None => line,
            }
        })
        .collect()
}

/// What a window showed over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowReport {
    /// Lines accepted after cleaning
    pub lines_received: usize,
    /// Visible lines at the moment the close signal arrived
    pub visible: Vec<String>,
    /// Whether the window was drawn on a terminal
    pub rendered: bool,
}

/// Terminal region owned by one window
struct Frame {
    out: Box<dyn Write + Send>,
    title: String,
    rows: usize,
    inner: usize,
    written: usize,
}

impl Frame {
    fn draw(&mut self, window: &DisplayWindow) -> io::Result<()> {
        let mut buf = CLEAR_LINE_UP.repeat(self.written);

        let title = console::truncate_str(&self.title, self.inner + 4, "…");
        buf.push_str(&format!("{}\n", style(title).bold()));
        buf.push_str(&format!("┌{}┐\n", "─".repeat(self.inner + 2)));
        for row in 0..self.rows {
            let text = window.get(row).unwrap_or("");
            let cell = pad_str(text, self.inner, Alignment::Left, Some(""));
            buf.push_str(&format!("│ {} │\n", style(cell).dim()));
        }
        buf.push_str(&format!("└{}┘\n", "─".repeat(self.inner + 2)));

        self.out.write_all(buf.as_bytes())?;
        self.out.flush()?;
        self.written = self.rows + FRAME_LINES;
        Ok(())
    }

    fn erase(&mut self) -> io::Result<()> {
        let buf = CLEAR_LINE_UP.repeat(self.written);
        self.out.write_all(buf.as_bytes())?;
        self.out.flush()?;
        self.written = 0;
        Ok(())
    }
}

/// The single consumer that owns the frame
struct Consumer {
    title: String,
    window: DisplayWindow,
    frame: Option<Frame>,
    tab_width: usize,
    max_width: Option<usize>,
    settle: Duration,
    received: usize,
}

impl Consumer {
    fn new(config: WindowConfig, out: Box<dyn Write + Send>) -> Self {
        let max_width = config
            .resolved_width()
            .map(|w| w.saturating_sub(config.margin.max(FRAME_COLS)).max(1));

        let frame = max_width.map(|inner| Frame {
            out,
            title: config.title.clone(),
            rows: config.lines,
            inner,
            written: 0,
        });
        if frame.is_none() {
            debug!(title = %config.title, "terminal width unknown, output window is headless");
        }

        Self {
            title: config.title,
            window: DisplayWindow::new(config.lines),
            frame,
            tab_width: config.tab_width,
            max_width,
            settle: config.settle,
            received: 0,
        }
    }

    fn redraw(&mut self) {
        if let Some(frame) = self.frame.as_mut() {
            if let Err(e) = frame.draw(&self.window) {
                warn!(error = %e, "output window rendering failed, continuing without display");
                self.frame = None;
            }
        }
    }

    fn accept(&mut self, raw: &str) {
        for line in clean_line(raw, self.tab_width, self.max_width) {
            if self.frame.is_none() {
                debug!(window = %self.title, line = %line, "output");
            }
            self.window.push(line);
            self.received += 1;
        }
        self.redraw();
    }

    async fn run(
        mut self,
        mut lines: mpsc::UnboundedReceiver<String>,
        mut close: oneshot::Receiver<()>,
    ) -> WindowReport {
        self.redraw();

        // A dropped handle also closes the window
        loop {
            tokio::select! {
                biased;
                _ = &mut close => break,
                line = lines.recv() => match line {
                    Some(line) => self.accept(&line),
                    None => break,
                },
            }
        }

        // Late producers are refused; lines already queued are still shown
        lines.close();
        while let Ok(line) = lines.try_recv() {
            self.accept(&line);
        }

        let rendered = self.frame.is_some();
        if let Some(frame) = self.frame.as_mut() {
            if let Err(e) = frame.erase() {
                warn!(error = %e, "failed to erase output window");
            }
        }
        if rendered && !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        WindowReport {
            lines_received: self.received,
            visible: self.window.snapshot(),
            rendered,
        }
    }
}

/// Entry point for spawning windows
pub struct OutputWindow;

impl OutputWindow {
    /// Start a window consumer writing to `out`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: WindowConfig, out: Box<dyn Write + Send>) -> WindowHandle {
        Self::spawn_counted(config, out, None)
    }

    fn spawn_counted(
        config: WindowConfig,
        out: Box<dyn Write + Send>,
        open: Option<Arc<watch::Sender<usize>>>,
    ) -> WindowHandle {
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();

        if let Some(open) = &open {
            open.send_modify(|n| *n += 1);
        }
        let consumer = Consumer::new(config, out);
        let task = tokio::spawn(async move {
            let report = consumer.run(line_rx, close_rx).await;
            if let Some(open) = open {
                open.send_modify(|n| *n = n.saturating_sub(1));
            }
            report
        });

        WindowHandle {
            lines: line_tx,
            close: Some(close_tx),
            task,
        }
    }
}

/// Producer side of a running window
pub struct WindowHandle {
    lines: LineSender,
    close: Option<oneshot::Sender<()>>,
    task: JoinHandle<WindowReport>,
}

impl WindowHandle {
    /// A sender producers can move into their own tasks
    pub fn sender(&self) -> LineSender {
        self.lines.clone()
    }

    /// Send one line
    pub fn send(&self, line: impl Into<String>) {
        let _ = self.lines.send(line.into());
    }

    /// Signal close and wait until the window has been erased
    pub async fn close(mut self) -> WindowReport {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "output window task ended abnormally");
                WindowReport::default()
            }
        }
    }
}

/// Opens windows with a shared configuration and writer
///
/// The factory counts windows whose consumer has not finished yet;
/// [`WindowFactory::wait_closed`] waits for all of them to be erased.
#[derive(Clone)]
pub struct WindowFactory {
    config: WindowConfig,
    writer: WriterFactory,
    open: Arc<watch::Sender<usize>>,
}

impl WindowFactory {
    /// Windows drawn on stdout
    pub fn stdout(config: WindowConfig) -> Self {
        Self::new(config, Arc::new(|| Box::new(Term::stdout()) as Box<dyn Write + Send>))
    }

    /// Windows drawn on writers produced by `writer`
    pub fn new(config: WindowConfig, writer: WriterFactory) -> Self {
        let (open, _) = watch::channel(0);
        Self {
            config,
            writer,
            open: Arc::new(open),
        }
    }

    /// Base configuration
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Open a window with the given title
    pub fn open(&self, title: impl Into<String>) -> WindowHandle {
        let config = self.config.clone().with_title(title);
        OutputWindow::spawn_counted(config, (self.writer)(), Some(self.open.clone()))
    }

    /// Windows opened here that have not been erased yet
    pub fn open_count(&self) -> usize {
        *self.open.borrow()
    }

    /// Wait until every window opened here has been erased
    ///
    /// Windows whose handle was dropped without `close` erase themselves, so this
    /// returns once their consumers catch up.
    pub async fn wait_closed(&self) {
        let mut rx = self.open.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Cloneable in-memory writer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }

    /// A writer factory handing out clones of this buffer
    pub fn factory(&self) -> WriterFactory {
        let buf = self.clone();
        Arc::new(move || Box::new(buf.clone()) as Box<dyn Write + Send>)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer lock poisoned"))?;
        inner.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(lines: usize) -> WindowConfig {
        WindowConfig::default()
            .with_lines(lines)
            .with_width(40)
            .with_settle(Duration::ZERO)
            .with_title("make build")
    }

    fn net_lines(output: &str) -> isize {
        output.matches('\n').count() as isize - output.matches("\x1b[1A").count() as isize
    }

    #[test]
    fn test_display_window_evicts_oldest() {
        let mut window = DisplayWindow::new(3);
        for line in ["a", "b", "c", "d", "e"] {
            window.push(line);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.snapshot(), ["c", "d", "e"]);
    }

    #[test]
    fn test_clean_line() {
        let lines = clean_line("\x1b[31mred\x1b[0m\tx", 4, None);
        assert_eq!(lines, ["red    x"]);

        let lines = clean_line("first\r\nsecond", 4, None);
        assert_eq!(lines, ["first", "second"]);

        let lines = clean_line("abcdefghij", 4, Some(5));
        assert_eq!(lines, ["abcde"]);
    }

    #[tokio::test]
    async fn test_window_shows_last_k_lines() {
        let buf = SharedBuffer::new();
        let handle = OutputWindow::spawn(config(3), Box::new(buf.clone()));
        for line in ["1", "2", "3", "4"] {
            handle.send(line);
        }
        let report = handle.close().await;

        assert!(report.rendered);
        assert_eq!(report.lines_received, 4);
        assert_eq!(report.visible, ["2", "3", "4"]);
        assert_eq!(net_lines(&buf.contents()), 0);
    }

    #[tokio::test]
    async fn test_frame_layout() {
        let buf = SharedBuffer::new();
        let handle = OutputWindow::spawn(config(2), Box::new(buf.clone()));
        handle.send("hello\tworld");
        let report = handle.close().await;
        assert_eq!(report.visible, ["hello    world"]);

        let out = console::strip_ansi_codes(&buf.contents()).into_owned();
        assert!(out.contains("make build\n"));
        assert!(out.contains(&format!("┌{}┐", "─".repeat(32))));
        assert!(out.contains(&format!("│ {:<30} │", "hello    world")));
        assert!(out.contains(&format!("└{}┘", "─".repeat(32))));
    }

    #[tokio::test]
    async fn test_small_margin_never_wraps() {
        let buf = SharedBuffer::new();
        let mut cfg = config(2).with_width(20);
        cfg.margin = 0;
        let handle = OutputWindow::spawn(cfg, Box::new(buf.clone()));
        handle.send("x".repeat(50));
        handle.send("short");
        let report = handle.close().await;
        assert_eq!(report.visible[0].len(), 16);

        let out = console::strip_ansi_codes(&buf.contents()).into_owned();
        for line in out.lines() {
            assert!(console::measure_text_width(line) <= 20, "{:?}", line);
        }
        assert_eq!(net_lines(&buf.contents()), 0);
    }

    #[tokio::test]
    async fn test_empty_window_leaves_no_trace() {
        let buf = SharedBuffer::new();
        let handle = OutputWindow::spawn(config(6), Box::new(buf.clone()));
        let report = handle.close().await;

        assert_eq!(report.lines_received, 0);
        let out = buf.contents();
        // Pre-rendered frame of K + 3 lines, then fully erased
        assert_eq!(out.matches('\n').count(), 9);
        assert_eq!(net_lines(&out), 0);
    }

    #[tokio::test]
    async fn test_producers_in_other_tasks() {
        let buf = SharedBuffer::new();
        let handle = OutputWindow::spawn(config(4), Box::new(buf.clone()));

        let mut producers = Vec::new();
        for p in 0..2 {
            let tx = handle.sender();
            producers.push(tokio::spawn(async move {
                for i in 0..10 {
                    let _ = tx.send(format!("p{}-{}", p, i));
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        let report = handle.close().await;
        assert_eq!(report.lines_received, 20);
        assert_eq!(report.visible.len(), 4);
        assert_eq!(net_lines(&buf.contents()), 0);
    }

    #[tokio::test]
    async fn test_headless_window_still_closes() {
        let buf = SharedBuffer::new();
        let cfg = config(3).with_headless();
        let handle = OutputWindow::spawn(cfg, Box::new(buf.clone()));
        handle.send("quiet");
        let report = handle.close().await;
        assert!(!report.rendered);
        assert_eq!(report.visible, ["quiet"]);
        assert!(buf.contents().is_empty());
    }

    #[tokio::test]
    async fn test_factory_opens_windows_on_shared_writer() {
        let buf = SharedBuffer::new();
        let factory = WindowFactory::new(config(2), buf.factory());
        let window = factory.open("first");
        window.send("x");
        window.close().await;
        let window = factory.open("second");
        window.close().await;

        let out = console::strip_ansi_codes(&buf.contents()).into_owned();
        assert!(out.contains("first"));
        assert!(out.contains("second"));
        assert_eq!(net_lines(&buf.contents()), 0);
    }

    #[tokio::test]
    async fn test_dropped_handle_is_erased() {
        let buf = SharedBuffer::new();
        let factory = WindowFactory::new(config(3), buf.factory());
        let window = factory.open("abandoned");
        let sender = window.sender();
        sender.send("one".to_string()).unwrap();
        sender.send("two".to_string()).unwrap();
        drop(window);

        factory.wait_closed().await;
        assert_eq!(factory.open_count(), 0);
        assert!(buf.contents().contains("two"));
        assert_eq!(net_lines(&buf.contents()), 0);
        assert!(sender.send("late".to_string()).is_err());
    }

    #[tokio::test]
    async fn test_open_count_tracks_windows() {
        let factory = WindowFactory::new(config(2), SharedBuffer::new().factory());
        let first = factory.open("a");
        let second = factory.open("b");
        assert_eq!(factory.open_count(), 2);

        first.close().await;
        assert_eq!(factory.open_count(), 1);
        second.close().await;
        assert_eq!(factory.open_count(), 0);
        factory.wait_closed().await;
    }
}
