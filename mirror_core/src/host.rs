// Seams between the engine and the page. The controller and session only talk
// to these traits; `CommandBuffer` turns the calls into JSON commands for JS.

use serde::{Deserialize, Serialize};

use crate::catalog::{CandidateCard, CatalogQuery, QueryId};
use crate::types::{CaptureSettings, Layout, OverlayItem, SessionId};

/// Widget visibility and picker contents.
pub trait Surface {
    fn set_layout(&mut self, layout: Layout);
    fn render_options(&mut self, cards: &[CandidateCard]);
    /// Transient status text; `None` clears it.
    fn show_notice(&mut self, text: Option<&str>);
}

/// Issues catalog queries. The answer comes back through the engine.
pub trait Catalog {
    fn request(&mut self, id: QueryId, query: &CatalogQuery);
}

/// Camera, pose estimator and overlay bitmap.
pub trait Preview {
    /// Open the camera and the estimator. Failures are reported with `session`.
    fn start_capture(&mut self, session: SessionId, settings: &CaptureSettings);
    /// Release the camera and the estimator.
    fn stop_capture(&mut self);
    fn load_overlay(&mut self, item: Option<&OverlayItem>);
}

pub trait Host: Surface + Catalog + Preview {}

impl<T: Surface + Catalog + Preview> Host for T {}

/// Command for the JS shell to apply, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostCommand {
    SetLayout(Layout),
    RenderOptions {
        cards: Vec<CandidateCard>,
    },
    ShowNotice {
        text: Option<String>,
    },
    FetchCatalog {
        query_id: QueryId,
        endpoint: String,
        params: Vec<(String, String)>,
    },
    StartCapture {
        session_id: SessionId,
        settings: CaptureSettings,
    },
    StopCapture,
    LoadOverlay {
        url: Option<String>,
    },
}

/// Records host calls as `HostCommand`s.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    endpoint: String,
    commands: Vec<HostCommand>,
}

impl CommandBuffer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        CommandBuffer {
            endpoint: endpoint.into(),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<HostCommand> {
        self.commands
    }

    pub fn count(&self, pred: impl Fn(&HostCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    pub fn last_layout(&self) -> Option<Layout> {
        self.commands.iter().rev().find_map(|c| match c {
            HostCommand::SetLayout(layout) => Some(*layout),
            _ => None,
        })
    }
}

impl Surface for CommandBuffer {
    fn set_layout(&mut self, layout: Layout) {
        self.commands.push(HostCommand::SetLayout(layout));
    }

    fn render_options(&mut self, cards: &[CandidateCard]) {
        self.commands.push(HostCommand::RenderOptions {
            cards: cards.to_vec(),
        });
    }

    fn show_notice(&mut self, text: Option<&str>) {
        self.commands.push(HostCommand::ShowNotice {
            text: text.map(str::to_string),
        });
    }
}

impl Catalog for CommandBuffer {
    fn request(&mut self, id: QueryId, query: &CatalogQuery) {
        self.commands.push(HostCommand::FetchCatalog {
            query_id: id,
            endpoint: self.endpoint.clone(),
            params: query.params(),
        });
    }
}

impl Preview for CommandBuffer {
    fn start_capture(&mut self, session: SessionId, settings: &CaptureSettings) {
        self.commands.push(HostCommand::StartCapture {
            session_id: session,
            settings: settings.clone(),
        });
    }

    fn stop_capture(&mut self) {
        self.commands.push(HostCommand::StopCapture);
    }

    fn load_overlay(&mut self, item: Option<&OverlayItem>) {
        self.commands.push(HostCommand::LoadOverlay {
            url: item.map(|i| i.source_url.clone()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionMode;

    #[test]
    fn commands_serialize_with_type_tag() {
        let mut buffer = CommandBuffer::new("/find_clothing");
        buffer.set_layout(Layout::for_mode(SessionMode::OptionPicker));
        buffer.stop_capture();
        buffer.start_capture(SessionId::new(3), &CaptureSettings::default());
        buffer.request(
            QueryId::new(4),
            &CatalogQuery {
                category: "men's clothing".into(),
                color: None,
                max_price: None,
            },
        );

        let json = serde_json::to_value(buffer.commands()).unwrap();
        assert_eq!(
            json[0],
            serde_json::json!({"type":"SetLayout","dashboard":false,"options":true,"preview":false})
        );
        assert_eq!(json[1], serde_json::json!({"type":"StopCapture"}));
        assert_eq!(json[2]["type"], "StartCapture");
        assert_eq!(json[2]["session_id"], 3);
        assert_eq!(json[2]["settings"]["width"], 640);
        assert_eq!(json[3]["query_id"], 4);
        assert_eq!(json[3]["params"][0][1], "men's clothing");
    }

    #[test]
    fn last_layout_finds_latest() {
        let mut buffer = CommandBuffer::default();
        assert_eq!(buffer.last_layout(), None);
        buffer.set_layout(Layout::for_mode(SessionMode::OptionPicker));
        buffer.show_notice(Some("hi"));
        buffer.set_layout(Layout::for_mode(SessionMode::Idle));
        assert_eq!(buffer.last_layout(), Some(Layout::for_mode(SessionMode::Idle)));
    }
}
