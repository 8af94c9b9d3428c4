//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::StatusFlags;
use super::app::{DebuggerApp, MEMORY_ROWS};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .split(frame.area());

    // Left side: code and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: RAM and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

/// Draw the instructions from PC onward.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible = (area.height as usize).saturating_sub(2);

    let items: Vec<ListItem> = app
        .disassembly
        .iter()
        .take(visible)
        .enumerate()
        .map(|(i, line)| {
            let is_current = i == 0;
            let is_break = app.breakpoints.contains(&line.address);
            let prefix = if is_current { "▶ " } else { "  " };
            let bp = if is_break { "●" } else { " " };

            let style = if is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if is_break {
                Style::default().fg(Color::Red)
            } else if !line.instruction.is_known() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}{}", bp, prefix, line)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw registers and the status flags.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.console.cpu().regs;
    let value = Style::default().fg(Color::White);

    let content = vec![
        Line::from(vec![
            Span::raw("A: "),
            Span::styled(format!("${:02X}", regs.a()), value),
            Span::raw("   X: "),
            Span::styled(format!("${:02X}", regs.x()), value),
            Span::raw("   Y: "),
            Span::styled(format!("${:02X}", regs.y()), value),
        ]),
        Line::from(vec![
            Span::raw("SP: "),
            Span::styled(format!("${:02X}", regs.sp()), value),
            Span::raw("   PC: "),
            Span::styled(format!("${:04X}", regs.pc()), Style::default().fg(Color::Yellow)),
        ]),
        flag_line(regs.status()),
        Line::from(vec![
            Span::raw("Steps: "),
            Span::styled(format!("{}", app.console.steps()), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.console.state()),
                if app.console.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                }),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// One span per flag, lit when set.
fn flag_line(flags: StatusFlags) -> Line<'static> {
    let mut spans = vec![Span::raw("P: ")];
    for (i, c) in flags.to_string().chars().enumerate() {
        let set = flags.to_byte() & (0x80 >> i) != 0;
        let style = if set {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(c.to_string(), style));
    }
    Line::from(spans)
}

/// Draw the work RAM as a hex dump.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let end = (start + visible_rows).min(MEMORY_ROWS);
    let sp = 0x0100 | app.console.cpu().regs.sp() as usize;

    let items: Vec<ListItem> = (start..end)
        .map(|row| {
            let base = row * 16;
            let bytes = app.console.ram().dump(base, 16);
            let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            let text = format!("{:04X}: {}", base, hex.join(" "));

            let style = if (base..base + 16).contains(&sp) {
                Style::default().fg(Color::Yellow)
            } else if bytes.iter().any(|&b| b != 0) {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" RAM ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓: Scroll RAM  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
