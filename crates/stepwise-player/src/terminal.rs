#![forbid(unsafe_code)]

//! Crossterm host for the player.
//!
//! [`TerminalSession`] owns raw mode and the alternate screen and gives both
//! back on drop, including on panic. [`run`] is the host loop: poll input,
//! feed it to a [`StepProgram`], and repaint whenever a frame was rendered.

use std::io::{self, Stdout, Write};
use std::sync::OnceLock;
use std::time::Duration;

use crossterm::{cursor, event, execute, queue, terminal};
use stepwise_core::event::Event;
use stepwise_runtime::frame::Frame;
use stepwise_runtime::program::Model;
use stepwise_runtime::step_program::StepProgram;

/// How long to wait for input before collecting task results.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Raw mode plus alternate screen, restored on drop.
#[derive(Debug)]
pub struct TerminalSession {
    stdout: Stdout,
}

impl TerminalSession {
    /// Enter raw mode and the alternate screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be switched.
    pub fn enter() -> io::Result<Self> {
        install_panic_hook();

        terminal::enable_raw_mode()?;
        tracing::info!("terminal raw mode enabled");

        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide) {
            best_effort_cleanup();
            return Err(err);
        }
        Ok(Self { stdout })
    }

    /// Current terminal size (columns, rows).
    pub fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    /// Paint `frame` from the top-left corner, clearing whatever it does
    /// not cover.
    pub fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        queue!(self.stdout, cursor::MoveTo(0, 0))?;
        for (row, line) in frame.lines().iter().enumerate() {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            queue!(
                self.stdout,
                cursor::MoveTo(0, row),
                terminal::Clear(terminal::ClearType::UntilNewLine)
            )?;
            self.stdout.write_all(line.as_bytes())?;
        }
        let used = u16::try_from(frame.lines().len()).unwrap_or(u16::MAX);
        if used < frame.height() {
            queue!(
                self.stdout,
                cursor::MoveTo(0, used),
                terminal::Clear(terminal::ClearType::FromCursorDown)
            )?;
        }
        self.stdout.flush()
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        best_effort_cleanup();
        tracing::info!("terminal restored");
    }
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            best_effort_cleanup();
            previous(info);
        }));
    });
}

fn best_effort_cleanup() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    let _ = stdout.flush();
}

/// Run `model` in the terminal until it quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up, read or drawn to.
pub fn run<M: Model>(model: M) -> io::Result<()> {
    let mut session = TerminalSession::enter()?;
    let (width, height) = session.size()?;
    let mut program = StepProgram::new(model, width, height);
    program.init();
    if let Some(frame) = program.last_frame() {
        session.draw(frame)?;
    }

    while program.is_running() {
        if event::poll(POLL_INTERVAL)? {
            // Drain everything that is already buffered before stepping.
            loop {
                if let Some(ev) = Event::from_crossterm(event::read()?) {
                    program.push_event(ev);
                }
                if !event::poll(Duration::ZERO)? {
                    break;
                }
            }
        }

        let result = program.step();
        for line in program.take_logs() {
            tracing::debug!(target: "stepwise::host", "{line}");
        }
        if !result.running {
            break;
        }
        if result.rendered
            && let Some(frame) = program.last_frame()
        {
            session.draw(frame)?;
        }
    }

    tracing::info!(frames = program.frame_idx(), "player exited");
    Ok(())
}
