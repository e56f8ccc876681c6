use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{key:<10}"), Style::default().fg(Color::Magenta)),
        Span::raw("  "),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key_line("Esc/Ctrl-C", "Quit"),
        key_line("Enter", "Run JobTailor"),
        key_line("Alt-Enter", "New line in the job description"),
        key_line("Ctrl-U", "Job source: URL"),
        key_line("Ctrl-T", "Job source: pasted text"),
        key_line("Ctrl-V", "Paste clipboard into the active input"),
        key_line("Backspace", "Delete last character"),
        key_line("F1 F2 F3", "Preview résumé / cover letter / ATS audit"),
        key_line("Tab", "Next preview"),
        key_line("F10", "Toggle this help"),
        Line::from(""),
        Line::from("The CV file and run options come from the command line (see --help)."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
