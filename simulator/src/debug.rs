use std::io::{stdout, Stdout, Write};

use crossterm::{cursor, terminal, ExecutableCommand, Result};

use crate::engine::{Motion, Simulation};

/// Redraws the building status in place, one frame per call.
pub struct StatusView {
    stdout: Stdout,
    lines_printed: u16,
}

impl StatusView {
    pub fn new() -> Self {
        StatusView {
            stdout: stdout(),
            lines_printed: 0,
        }
    }

    pub fn print_status(&mut self, simulation: &Simulation) -> Result<()> {
        if self.lines_printed > 0 {
            self.stdout.execute(cursor::MoveUp(self.lines_printed))?;
        }
        self.stdout.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;

        let mut lines: Vec<String> = Vec::new();
        let registry = simulation.dispatcher().registry();

        lines.push(format!("t = {:.1} s", simulation.clock()));
        lines.push("+------------+------------+------------+------------+".to_string());
        lines.push(format!("| {0:<10} | {1:<10} | {2:<10} | {3:<10} |", "FLOOR", "HALL UP", "HALL DOWN", "WAITING"));
        for (floor, state) in simulation.floors().iter().enumerate().rev() {
            let floor = floor as u8;
            lines.push("+------------+------------+------------+------------+".to_string());
            lines.push(format!(
                "| {0:<10} | {1:<10} | {2:<10} | {3:<10} |",
                floor,
                button(state.up_lit, registry.contains_up(floor)),
                button(state.down_lit, registry.contains_down(floor)),
                state.waiting.len(),
            ));
        }
        lines.push("+------------+------------+------------+------------+".to_string());
        lines.push(String::new());

        lines.push("+------------+------------+------------+------------+------------+".to_string());
        lines.push(format!(
            "| {0:<10} | {1:<10} | {2:<10} | {3:<10} | {4:<10} |",
            "CAR", "POSITION", "HEADING", "RIDERS", "STOPS"
        ));
        for (id, controller) in simulation.dispatcher().controllers().iter().enumerate() {
            let body = simulation.car(id);
            let state = match body.motion {
                Motion::Stopped if controller.is_idle() => "idle".to_string(),
                Motion::Stopped => "stopped".to_string(),
                Motion::Moving(direction) => format!("moving {}", direction),
                Motion::DoorsOpen { .. } => "doors open".to_string(),
            };
            let stops: Vec<String> = controller
                .target()
                .into_iter()
                .chain(controller.stops().iter().copied())
                .map(|floor| floor.to_string())
                .collect();
            lines.push("+------------+------------+------------+------------+------------+".to_string());
            lines.push(format!(
                "| {0:<10} | {1:<10.2} | {2:<10} | {3:<10} | {4:<10} |",
                id,
                body.position,
                controller.direction(),
                format!("{}/{}", body.riders.len(), body.capacity),
                stops.join(","),
            ));
            lines.push(format!("| {0:<10} | {1:<10} |", "", state));
        }
        lines.push("+------------+------------+------------+------------+------------+".to_string());

        let stats = simulation.stats();
        lines.push(format!(
            "spawned {}  delivered {}  average wait {:.1} s",
            stats.spawned,
            stats.delivered,
            stats.average_wait()
        ));

        for line in &lines {
            writeln!(self.stdout, "{}", line)?;
        }
        self.lines_printed = lines.len() as u16;
        Ok(())
    }
}

// Lit and still unclaimed, lit and taken by a car, or dark.
fn button(lit: bool, pending: bool) -> &'static str {
    match (lit, pending) {
        (true, true) => "waiting",
        (true, false) => "claimed",
        (false, _) => "-",
    }
}
