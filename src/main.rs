mod agent;
mod config;
mod controller;
mod error;
mod llm;
mod search;
mod tools;
mod trace;
mod transcript;

use iced::{
    widget::{
        button, center, column, container, opaque, row, scrollable, stack, text, text_input,
        text_input::Id, Space,
    },
    Element, Length, Task, Theme, Font, Subscription, Color,
    time, clipboard,
    keyboard::{self, Key},
    event::{self, Event as IcedEvent},
    alignment, font,
    window,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agent::{Agent, ReactAgent};
use controller::{QueryController, QueryOutcome, QueryState};
use transcript::{clock, AlertLevel, LogKind, Panes, TIMESTAMP_RGB};

const TITLE: &str = "🤖 Web-Searching Agentic AI";
const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,wgpu_core=warn,wgpu_hal=warn,naga=warn")
            }),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Credentials are checked before any window exists.
    let config = config::AppConfig::load().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    let window = window::Settings {
        size: iced::Size::new(
            config.settings.window.width as f32,
            config.settings.window.height as f32,
        ),
        position: window::Position::Centered,
        ..Default::default()
    };

    iced::application(TITLE, App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window)
        .run_with(move || App::new(config))?;

    Ok(())
}

#[derive(Clone)]
struct AgentHandle(Arc<dyn Agent>);

impl fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AgentHandle")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Steps,
    Conversation,
}

#[derive(Debug, Clone)]
enum Message {
    InputChanged(String),
    Submit,
    AgentInitialized(Result<AgentHandle, String>),
    QueryFinished(QueryOutcome),
    Clear,
    SelectTab(Tab),
    DismissAlert,
    CopyAnswer,
    Tick,
}

struct App {
    input_text: String,
    controller: QueryController,
    panes: Panes,
    tab: Tab,
    loading_frame: usize,
    input_id: Id,
    steps_id: scrollable::Id,
    conversation_id: scrollable::Id,
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::from_rgb8(r, g, b)
}

impl App {
    fn new(config: config::AppConfig) -> (Self, Task<Message>) {
        let input_id = Id::unique();

        let app = App {
            input_text: String::new(),
            controller: QueryController::new(),
            panes: Panes::default(),
            tab: Tab::Steps,
            loading_frame: 0,
            input_id: input_id.clone(),
            steps_id: scrollable::Id::unique(),
            conversation_id: scrollable::Id::unique(),
        };

        // Build the agent off the UI thread; submission stays disabled until it lands.
        let init_task = Task::perform(
            async move {
                ReactAgent::from_config(&config)
                    .map(|agent| AgentHandle(Arc::new(agent)))
                    .map_err(|e| e.to_string())
            },
            Message::AgentInitialized,
        );

        (app, Task::batch([init_task, text_input::focus(input_id)]))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InputChanged(value) => {
                self.input_text = value;
                Task::none()
            }
            Message::Submit => match self.controller.submit(&self.input_text, &mut self.panes) {
                Ok(pending) => {
                    self.input_text.clear();
                    self.loading_frame = 0;
                    Task::batch([
                        self.scroll_to_end(),
                        Task::perform(pending.run(), Message::QueryFinished),
                    ])
                }
                Err(_) => Task::none(),
            },
            Message::AgentInitialized(Ok(AgentHandle(agent))) => {
                self.controller.agent_ready(agent, &mut self.panes);
                self.scroll_to_end()
            }
            Message::AgentInitialized(Err(e)) => {
                self.controller
                    .agent_failed(&error::Error::AgentInit(e), &mut self.panes);
                self.scroll_to_end()
            }
            Message::QueryFinished(outcome) => {
                self.controller.finish(outcome, &mut self.panes);
                Task::batch([self.scroll_to_end(), text_input::focus(self.input_id.clone())])
            }
            Message::Clear => {
                self.controller.clear(&mut self.panes);
                self.input_text.clear();
                Task::none()
            }
            Message::SelectTab(tab) => {
                self.tab = tab;
                self.scroll_to_end()
            }
            Message::DismissAlert => {
                self.panes.dismiss_alert();
                text_input::focus(self.input_id.clone())
            }
            Message::CopyAnswer => match self.panes.last_answer() {
                Some(entry) => clipboard::write(entry.text.clone()),
                None => Task::none(),
            },
            Message::Tick => {
                self.loading_frame = (self.loading_frame + 1) % SPINNER_FRAMES.len();
                Task::none()
            }
        }
    }

    fn scroll_to_end(&self) -> Task<Message> {
        Task::batch([
            scrollable::snap_to(self.steps_id.clone(), scrollable::RelativeOffset::END),
            scrollable::snap_to(self.conversation_id.clone(), scrollable::RelativeOffset::END),
        ])
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if self.panes.state == QueryState::InFlight {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| {
            if let IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) = event
            {
                Some(Message::DismissAlert)
            } else {
                None
            }
        });

        Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<'_, Message> {
        let in_flight = self.panes.state == QueryState::InFlight;

        let header = container(text(TITLE).size(22).color(Color::WHITE))
            .padding(14)
            .width(Length::Fill)
            .align_x(alignment::Horizontal::Center)
            .style(|_theme: &Theme| container::Style {
                background: Some(rgb([0x2c, 0x3e, 0x50]).into()),
                ..container::Style::default()
            });

        let input = text_input("Your question...", &self.input_text)
            .on_input(Message::InputChanged)
            .on_submit(Message::Submit)
            .padding(12)
            .size(16)
            .id(self.input_id.clone());

        let send_label = if in_flight { "⏳ Processing..." } else { "🚀 Send Query" };
        let send = button(text(send_label))
            .padding([10, 20])
            .style(button::primary)
            .on_press_maybe((!in_flight).then_some(Message::Submit));
        let clear = button(text("🗑️ Clear"))
            .padding([10, 20])
            .style(button::danger)
            .on_press(Message::Clear);

        let mut controls = row![send, clear].spacing(10).align_y(alignment::Vertical::Center);
        if !in_flight && self.panes.last_answer().is_some() {
            controls = controls.push(
                button(text("[Copy]").size(14))
                    .padding(10)
                    .style(button::secondary)
                    .on_press(Message::CopyAnswer),
            );
        }
        controls = controls.push(Space::with_width(Length::Fill));
        if in_flight {
            controls = controls.push(text(SPINNER_FRAMES[self.loading_frame]).size(24));
        }

        let tabs = row![
            tab_button("🧠 ReAct Steps", Tab::Steps, self.tab),
            tab_button("💬 Conversation", Tab::Conversation, self.tab),
        ]
        .spacing(4);

        let pane = match self.tab {
            Tab::Steps => self.steps_pane(),
            Tab::Conversation => self.conversation_pane(),
        };

        let status_bar = container(text(self.controller.status()).size(13).color(Color::WHITE))
            .padding([6, 10])
            .width(Length::Fill)
            .style(|_theme: &Theme| container::Style {
                background: Some(rgb([0x34, 0x49, 0x5e]).into()),
                ..container::Style::default()
            });

        let content = column![
            header,
            text("Your Question:").size(14),
            input,
            controls,
            tabs,
            pane,
            status_bar,
        ]
        .spacing(10)
        .padding(10);

        let base = container(content).width(Length::Fill).height(Length::Fill);

        match &self.panes.alert {
            Some(alert) => {
                let accent = match alert.level {
                    AlertLevel::Warning => LogKind::Warning.rgb(),
                    AlertLevel::Error => LogKind::Error.rgb(),
                };
                let dialog = container(
                    column![
                        text(&alert.title).size(18).color(rgb(accent)),
                        text(&alert.message).size(15),
                        button(text("OK")).padding([6, 24]).on_press(Message::DismissAlert),
                    ]
                    .spacing(14),
                )
                .padding(20)
                .max_width(420.0)
                .style(container::rounded_box);

                let backdrop = center(opaque(dialog)).style(|_theme: &Theme| container::Style {
                    background: Some(Color { a: 0.6, ..Color::BLACK }.into()),
                    ..container::Style::default()
                });

                stack![base, opaque(backdrop)].into()
            }
            None => base.into(),
        }
    }

    fn steps_pane(&self) -> Element<'_, Message> {
        let bold = Font {
            weight: font::Weight::Bold,
            ..Font::MONOSPACE
        };

        let lines = self.panes.steps.visible().iter().fold(
            column![].spacing(4),
            |lines, entry| {
                lines.push(row![
                    text(format!("[{}] ", clock(&entry.timestamp)))
                        .font(Font::MONOSPACE)
                        .color(rgb(TIMESTAMP_RGB)),
                    text(&entry.message)
                        .font(bold)
                        .color(rgb(entry.kind.rgb()))
                        .width(Length::Fill),
                ])
            },
        );

        container(
            scrollable(container(lines).padding(10).width(Length::Fill))
                .id(self.steps_id.clone())
                .height(Length::Fill),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .style(|_theme: &Theme| container::Style {
            background: Some(rgb([0x2c, 0x3e, 0x50]).into()),
            ..container::Style::default()
        })
        .into()
    }

    fn conversation_pane(&self) -> Element<'_, Message> {
        let entries = self.panes.conversation.visible().iter().fold(
            column![].spacing(14),
            |entries, entry| {
                entries.push(
                    text(format!("[{}] {}", clock(&entry.timestamp), entry.display()))
                        .size(15)
                        .color(rgb([0x2c, 0x3e, 0x50])),
                )
            },
        );

        container(
            scrollable(container(entries).padding(10).width(Length::Fill))
                .id(self.conversation_id.clone())
                .height(Length::Fill),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .style(|_theme: &Theme| container::Style {
            background: Some(Color::WHITE.into()),
            ..container::Style::default()
        })
        .into()
    }

    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn tab_button(label: &'static str, tab: Tab, active: Tab) -> Element<'static, Message> {
    let style = if tab == active {
        button::primary
    } else {
        button::secondary
    };
    button(text(label))
        .padding([8, 16])
        .style(style)
        .on_press(Message::SelectTab(tab))
        .into()
}
