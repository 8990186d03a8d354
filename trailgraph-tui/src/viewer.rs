use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Wrap,
        canvas::{Canvas, Line as CanvasLine, Points},
    },
};
use std::io;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tokio::sync::mpsc;
use trailgraph_core::{
    Notice, NoticeLevel, RenderSession, Request, SessionEffect, SessionEvent,
};

const RECENT_VISITS: usize = 10;
const CANVAS_PADDING: f64 = 40.0;

/// Terminal front end for a [`RenderSession`].
///
/// Events arrive on `rx` (graph snapshots, tab lists, notices); requests the
/// session produces go out on `requests`.
pub struct GraphViewer {
    session: RenderSession,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    requests: mpsc::UnboundedSender<Request>,
    scroll_nodes: usize,
    should_quit: bool,
}

impl GraphViewer {
    pub fn new(
        session: RenderSession,
        rx: mpsc::UnboundedReceiver<SessionEvent>,
        requests: mpsc::UnboundedSender<Request>,
    ) -> Self {
        Self {
            session,
            rx,
            requests,
            scroll_nodes: 0,
            should_quit: false,
        }
    }

    pub fn session(&self) -> &RenderSession {
        &self.session
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Ask for the first graph
    pub fn start(&mut self) {
        let effects = self.session.start();
        self.send(effects);
    }

    pub fn apply(&mut self, event: SessionEvent) {
        let effects = self.session.handle(event);
        self.send(effects);
    }

    fn send(&mut self, effects: Vec<SessionEffect>) {
        for SessionEffect::Send(request) in effects {
            if self.requests.send(request).is_err() {
                self.session
                    .handle(SessionEvent::Notice(Notice::error("History service stopped")));
            }
        }
    }

    /// Drain pending events without blocking
    pub fn process_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Up => self.apply(SessionEvent::SelectPrev),
            KeyCode::Down => self.apply(SessionEvent::SelectNext),
            KeyCode::Enter => self.apply(SessionEvent::Activate),
            KeyCode::Char(' ') => self.apply(SessionEvent::ToggleLayout),
            KeyCode::Char('r') => self.apply(SessionEvent::Reload),
            KeyCode::Char('[') => self.apply(SessionEvent::AdjustDays(-1)),
            KeyCode::Char(']') => self.apply(SessionEvent::AdjustDays(1)),
            KeyCode::Home => {
                if let Some(first) = self.session.graph().nodes.first() {
                    self.apply(SessionEvent::Select(Some(first.url.clone())));
                }
            }
            KeyCode::End => {
                if let Some(last) = self.session.graph().nodes.last() {
                    self.apply(SessionEvent::Select(Some(last.url.clone())));
                }
            }
            _ => {}
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(10),   // Main area
                Constraint::Length(1), // Notice bar
                Constraint::Length(1), // Hints bar
            ])
            .split(f.area());

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(vertical_chunks[0]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(10),    // Layout canvas
                Constraint::Length(8),  // Selected node
                Constraint::Length(RECENT_VISITS as u16 + 2),
            ])
            .split(main_chunks[1]);

        self.render_nodes(f, main_chunks[0]);
        self.render_canvas(f, right_chunks[0]);
        self.render_details(f, right_chunks[1]);
        self.render_visits(f, right_chunks[2]);
        self.render_notice(f, vertical_chunks[1]);
        self.render_hints(f, vertical_chunks[2]);
    }

    fn render_nodes(&mut self, f: &mut Frame, area: Rect) {
        let graph = self.session.graph();
        let title = if self.session.is_loading() {
            format!(" Pages ({}) loading… ", graph.nodes.len())
        } else {
            format!(" Pages ({}) ", graph.nodes.len())
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let height = inner.height as usize;
        if graph.nodes.is_empty() {
            let empty_msg = Paragraph::new(format!(
                "No history in the last {} day(s)",
                self.session.days()
            ))
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
            f.render_widget(empty_msg, inner);
            return;
        }

        // Keep the selection in view
        if let Some(selected) = self.session.selected_position() {
            if selected < self.scroll_nodes {
                self.scroll_nodes = selected;
            } else if height > 0 && selected >= self.scroll_nodes + height {
                self.scroll_nodes = selected + 1 - height;
            }
        }

        let selected = self.session.selected_position();
        let items: Vec<ListItem> = graph
            .nodes
            .iter()
            .enumerate()
            .skip(self.scroll_nodes)
            .take(height)
            .map(|(idx, node)| {
                let open = self.session.is_open(&node.url);
                let marker = if open { "●" } else { " " };
                let text = format!("{} {} ({})", marker, node.url, node.visit_ids.len());

                let mut style = if Some(idx) == selected {
                    Style::default().fg(Color::Yellow)
                } else if self.session.is_highlighted_node(&node.url) {
                    Style::default().fg(Color::Cyan)
                } else if open {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::White)
                };
                if Some(idx) == selected {
                    style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
                }
                ListItem::new(text).style(style)
            })
            .collect();

        f.render_widget(List::new(items), inner);
    }

    fn render_canvas(&self, f: &mut Frame, area: Rect) {
        let border_color = if self.session.layout_running() {
            Color::Green
        } else {
            Color::DarkGray
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Graph [{}] ", self.session.layout_indicator()))
            .border_style(Style::default().fg(border_color));

        let layout = self.session.layout();
        let positions = layout.positions();
        let ((min_x, min_y), (max_x, max_y)) = match layout.bounds() {
            Some((min, max)) => ((min.x, min.y), (max.x, max.y)),
            None => ((-1.0, -1.0), (1.0, 1.0)),
        };

        let graph = self.session.graph();
        let edges = self.session.index().edge_positions();

        let canvas = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .x_bounds([min_x - CANVAS_PADDING, max_x + CANVAS_PADDING])
            .y_bounds([min_y - CANVAS_PADDING, max_y + CANVAS_PADDING])
            .paint(|ctx| {
                for (edge, &(s, t)) in graph.edges.iter().zip(edges.iter()) {
                    let (Some(a), Some(b)) = (positions.get(s), positions.get(t)) else {
                        continue;
                    };
                    let color = if self.session.is_highlighted_edge(edge) {
                        Color::Yellow
                    } else {
                        Color::DarkGray
                    };
                    ctx.draw(&CanvasLine::new(a.x, a.y, b.x, b.y, color));
                }
                ctx.layer();

                for (node, p) in graph.nodes.iter().zip(positions.iter()) {
                    let color = if self.session.selected_url() == Some(node.url.as_str()) {
                        Color::Yellow
                    } else if self.session.is_highlighted_node(&node.url) {
                        Color::Cyan
                    } else if self.session.is_open(&node.url) {
                        Color::Green
                    } else {
                        Color::White
                    };
                    ctx.draw(&Points {
                        coords: &[(p.x, p.y)],
                        color,
                    });
                }

                if let Some(pos) = self.session.selected_position()
                    && let (Some(p), Some(url)) = (positions.get(pos), self.session.selected_url())
                {
                    ctx.print(
                        p.x,
                        p.y,
                        Line::styled(url.to_string(), Style::default().fg(Color::Yellow)),
                    );
                }
            });

        f.render_widget(canvas, area);
    }

    fn render_details(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Selected ")
            .border_style(Style::default().fg(Color::Yellow));

        let text = match self.session.selected_node() {
            None => vec![Line::from(Span::styled(
                "↑/↓ to select a page",
                Style::default().fg(Color::DarkGray),
            ))],
            Some(node) => {
                let index = self.session.index();
                let mut lines = vec![
                    Line::from(Span::styled(
                        node.url.clone(),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(vec![
                        Span::styled("Visits: ", Style::default().fg(Color::DarkGray)),
                        Span::raw(node.visit_ids.len().to_string()),
                        Span::styled("  In: ", Style::default().fg(Color::DarkGray)),
                        Span::raw(index.in_degree(&node.url).to_string()),
                        Span::styled("  Out: ", Style::default().fg(Color::DarkGray)),
                        Span::raw(index.out_degree(&node.url).to_string()),
                        Span::styled("  Tab: ", Style::default().fg(Color::DarkGray)),
                        Span::raw(if self.session.is_open(&node.url) { "open" } else { "-" }),
                    ]),
                ];
                for edge in self.session.selected_edges() {
                    let line = if edge.source == node.url {
                        format!("  → {}  (via #{})", edge.target, edge.visit_id)
                    } else {
                        format!("  ← {}  (via #{})", edge.source, edge.visit_id)
                    };
                    lines.push(Line::from(line));
                }
                lines
            }
        };

        let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_visits(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Recent Visits ")
            .border_style(Style::default().fg(Color::Magenta));

        let graph = self.session.graph();
        let items: Vec<ListItem> = graph
            .recent_visits(RECENT_VISITS)
            .into_iter()
            .map(|visit| {
                let referrer = visit
                    .referring_visit_id
                    .as_ref()
                    .map(|r| format!(" ← #{}", r))
                    .unwrap_or_default();
                ListItem::new(format!("#{} {}{}", visit.visit_id, visit.url, referrer))
                    .style(Style::default().fg(Color::Blue))
            })
            .collect();

        f.render_widget(List::new(items).block(block), area);
    }

    fn render_notice(&self, f: &mut Frame, area: Rect) {
        let paragraph = match self.session.notice() {
            Some(notice) => {
                let (prefix, color) = match notice.level {
                    NoticeLevel::Info => ("INFO ", Color::Blue),
                    NoticeLevel::Warn => ("WARN ", Color::Yellow),
                    NoticeLevel::Error => ("ERROR", Color::Red),
                };
                Paragraph::new(format!(" [{}] {}", prefix, notice.message))
                    .style(Style::default().fg(color))
            }
            None => Paragraph::new(format!(
                " Last {} day(s) · {} pages · {} links",
                self.session.days(),
                self.session.graph().nodes.len(),
                self.session.graph().edges.len()
            ))
            .style(Style::default().fg(Color::DarkGray)),
        };
        f.render_widget(paragraph, area);
    }

    fn render_hints(&self, f: &mut Frame, area: Rect) {
        let key = Style::default().fg(Color::Black).bg(Color::Gray);
        let hints = Line::from(vec![
            Span::styled(" q/ESC ", key),
            Span::raw(" Exit  "),
            Span::styled(" ↑/↓ ", key),
            Span::raw(" Select  "),
            Span::styled(" Enter ", key),
            Span::raw(" Open/Focus  "),
            Span::styled(" Space ", key),
            Span::raw(" Layout  "),
            Span::styled(" r ", key),
            Span::raw(" Reload  "),
            Span::styled(" [/] ", key),
            Span::raw(" Days"),
        ]);

        let paragraph = Paragraph::new(hints).style(Style::default().bg(Color::Black).fg(Color::Gray));
        f.render_widget(paragraph, area);
    }
}

/// Run the graph viewer (blocking function, should be run in separate thread)
pub fn run_viewer(
    session: RenderSession,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    requests: mpsc::UnboundedSender<Request>,
    should_exit: Arc<AtomicBool>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut viewer = GraphViewer::new(session, rx, requests);
    viewer.start();

    let result = run_loop(&mut terminal, &mut viewer, &should_exit);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    viewer: &mut GraphViewer,
    should_exit: &AtomicBool,
) -> Result<()> {
    loop {
        viewer.process_events();
        viewer.apply(SessionEvent::Tick);

        terminal.draw(|f| viewer.draw(f))?;

        if should_exit.load(Ordering::Relaxed) || viewer.should_quit() {
            break;
        }

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            viewer.handle_key(key);
        }
    }
    Ok(())
}

/// Create a channel pair for feeding the viewer
pub fn create_viewer_channel() -> (
    mpsc::UnboundedSender<SessionEvent>,
    mpsc::UnboundedReceiver<SessionEvent>,
) {
    mpsc::unbounded_channel()
}
