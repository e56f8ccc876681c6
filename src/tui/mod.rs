mod clipboard;
mod help;
mod state;

use crate::cli::{build_config, form_from_args, Cli};
use crate::endpoint::HttpRunEndpoint;
use crate::input_mode::InputField;
use crate::model::{JobSource, RunEvent, RunLifecycle, TabKey};
use crate::orchestrator::{self, RunOrchestrator, SessionView, UiCommand};
use crate::progress::STAGES;
use crate::validate::FormState;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::UiState;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let form = form_from_args(&args).await?;
    let endpoint = Arc::new(HttpRunEndpoint::new(&cfg)?);

    // Unbounded channels avoid backpressure between the UI thread and the runtime.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let orch = RunOrchestrator::with_events(endpoint.clone(), cfg.tick_interval, event_tx.clone());

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_orch = orch.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(form, ui_orch, event_rx, cmd_tx));

    let res = orchestrator::run_controller(
        &cfg,
        endpoint,
        orch,
        args.export_json.clone(),
        event_tx,
        cmd_rx,
    )
    .await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    form: FormState,
    orch: RunOrchestrator,
    mut event_rx: UnboundedReceiver<RunEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; run state is read from orchestrator snapshots.
    let mut state = UiState::new(form);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            let view = orch.snapshot();
            terminal.draw(|f| draw(f.area(), f, &state, &view)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
            continue;
        }
        let Ok(Event::Key(k)) = event::read() else {
            continue;
        };
        if k.kind != KeyEventKind::Press {
            continue;
        }
        match (k.modifiers, k.code) {
            (_, KeyCode::Esc) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                let _ = cmd_tx.send(UiCommand::Quit);
                break Ok(());
            }
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => state.set_mode(JobSource::Url),
            (KeyModifiers::CONTROL, KeyCode::Char('t')) => state.set_mode(JobSource::Text),
            (KeyModifiers::CONTROL, KeyCode::Char('v')) => match clipboard::paste_text() {
                Ok(text) => {
                    let text = match state.form.inputs.mode() {
                        JobSource::Url => text.trim().to_string(),
                        JobSource::Text => text,
                    };
                    state.form.inputs.push_str(&text);
                    state.info = format!("Pasted {} character(s)", text.chars().count());
                }
                Err(e) => state.info = format!("Clipboard paste failed: {e:#}"),
            },
            (m, KeyCode::Enter) if m.contains(KeyModifiers::ALT) => state.insert_newline(),
            (_, KeyCode::Enter) => {
                if let Some(cmd) = state.request_submit(orch.snapshot().button.enabled) {
                    let _ = cmd_tx.send(cmd);
                }
            }
            (_, KeyCode::F(1)) => orch.select_tab(TabKey::Cv),
            (_, KeyCode::F(2)) => orch.select_tab(TabKey::Cover),
            (_, KeyCode::F(3)) => orch.select_tab(TabKey::Audit),
            (_, KeyCode::F(10)) => state.show_help = !state.show_help,
            (_, KeyCode::Tab) => {
                let next = orch.snapshot().previews.active_tab().next();
                orch.select_tab(next);
            }
            (_, KeyCode::Backspace) => state.form.inputs.pop_char(),
            (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
                state.form.inputs.push_char(c);
            }
            _ => {}
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, view: &SessionView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(rows[0]);

    draw_form(cols[0], f, state, view);
    draw_preview(cols[1], f, view);

    f.render_widget(
        Paragraph::new(Span::styled(
            state.info.clone(),
            Style::default().fg(Color::Gray),
        )),
        rows[1],
    );

    if state.show_help {
        help::draw_help(centered(area, 70, 16), f);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn input_paragraph<'a>(title: &'a str, field: &'a InputField) -> Paragraph<'a> {
    let (text, style) = if !field.enabled {
        ("(disabled)".to_string(), Style::default().fg(Color::DarkGray))
    } else if field.value.is_empty() {
        (field.placeholder.clone(), Style::default().fg(Color::DarkGray))
    } else {
        (format!("{}▏", field.value), Style::default())
    };
    let border = if field.enabled {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Paragraph::new(Text::styled(text, style))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        )
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState, view: &SessionView) {
    let error_height = if view.error.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Length(STAGES.len() as u16 + 2),
                Constraint::Length(error_height),
            ]
            .as_ref(),
        )
        .split(area);

    let mode = state.form.inputs.mode();
    let segments = Tabs::new(vec![Line::from("Job URL"), Line::from("Job text")])
        .select(match mode {
            JobSource::Url => 0,
            JobSource::Text => 1,
        })
        .block(Block::default().borders(Borders::ALL).title("tailor-pack-cli"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(segments, chunks[0]);

    f.render_widget(input_paragraph("Job URL", state.form.inputs.url()), chunks[1]);
    f.render_widget(
        input_paragraph("Job description", state.form.inputs.text()),
        chunks[2],
    );

    let opts = &state.form.options;
    let on = |b: bool| if b { "on" } else { "off" };
    let settings = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("CV: ", Style::default().fg(Color::Gray)),
            Span::raw(state.form.cv_label().to_string()),
        ]),
        Line::from(format!(
            "cover {} · pdf {} · debug {} · dry-run {} · {} @ {}",
            on(opts.include_cover_letter),
            on(opts.make_pdf),
            on(opts.debug_artifacts),
            on(opts.dry_run),
            opts.model,
            opts.temperature
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title("Settings"));
    f.render_widget(settings, chunks[3]);

    let button_style = if view.button.enabled {
        Style::default().fg(Color::Black).bg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(format!(" {} ", view.button.label), button_style)),
        )
        .gauge_style(Style::default().fg(match view.lifecycle {
            RunLifecycle::Failed => Color::Red,
            RunLifecycle::Succeeded => Color::Green,
            _ => Color::Cyan,
        }))
        .percent(u16::from(view.progress.percent))
        .label(format!("{}% · {}", view.progress.percent, view.progress.label));
    f.render_widget(gauge, chunks[4]);

    let stage_lines: Vec<Line> = STAGES
        .iter()
        .enumerate()
        .map(|(i, label)| {
            if view.progress.is_stage_done(i) {
                Line::from(vec![
                    Span::styled("✓ ", Style::default().fg(Color::Green)),
                    Span::raw(*label),
                ])
            } else {
                Line::from(Span::styled(
                    format!("· {label}"),
                    Style::default().fg(Color::DarkGray),
                ))
            }
        })
        .collect();
    f.render_widget(
        Paragraph::new(stage_lines).block(Block::default().borders(Borders::ALL).title("Stages")),
        chunks[5],
    );

    if let Some(err) = view.error.as_deref() {
        f.render_widget(
            Paragraph::new(Span::styled(
                err.to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title("Error"),
            ),
            chunks[6],
        );
    }
}

fn draw_preview(area: Rect, f: &mut ratatui::Frame, view: &SessionView) {
    let results_height = (view.results.links().len() as u16 + 2).clamp(3, 10);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(results_height),
            ]
            .as_ref(),
        )
        .split(area);

    let active = view.previews.active_tab();
    let tabs = Tabs::new(
        TabKey::ALL
            .iter()
            .map(|k| Line::from(k.title()))
            .collect::<Vec<_>>(),
    )
    .select(active.index())
    .block(Block::default().borders(Borders::ALL).title("Preview"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    f.render_widget(
        Paragraph::new(view.previews.rendered().to_string())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(active.title())),
        chunks[1],
    );

    let lines: Vec<Line> = if view.results.is_empty() {
        vec![Line::from(Span::styled(
            "No files yet",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        view.results
            .links()
            .iter()
            .map(|l| {
                Line::from(vec![
                    Span::raw("↗ "),
                    Span::styled(
                        l.href.clone(),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::UNDERLINED),
                    ),
                ])
            })
            .collect()
    };
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Created files")),
        chunks[2],
    );
}
