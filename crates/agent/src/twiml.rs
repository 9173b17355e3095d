//! TwiML response builder
//!
//! Verbs are appended in playback order; `build` renders the document.

use std::fmt::Write;

/// Speech gather options
#[derive(Debug, Clone, PartialEq)]
pub struct GatherOptions {
    /// Webhook the transcription is posted to
    pub action: String,
    /// Seconds of silence before giving up
    pub timeout_secs: u32,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Verb {
    Play(String),
    Say { voice: String, language: String, text: String },
    Gather(GatherOptions),
    Redirect(String),
    Hangup,
}

#[derive(Debug, Clone, Default)]
pub struct TwimlBuilder {
    verbs: Vec<Verb>,
}

impl TwimlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Play(url.into()));
        self
    }

    /// Provider-voiced speech, used when no synthesized audio is available
    pub fn say(
        mut self,
        voice: impl Into<String>,
        language: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.verbs.push(Verb::Say {
            voice: voice.into(),
            language: language.into(),
            text: text.into(),
        });
        self
    }

    pub fn gather(mut self, options: GatherOptions) -> Self {
        self.verbs.push(Verb::Gather(options));
        self
    }

    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Redirect(url.into()));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn build(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
        for verb in &self.verbs {
            // Writing into a String cannot fail
            let _ = match verb {
                Verb::Play(url) => write!(xml, "<Play>{}</Play>", escape(url)),
                Verb::Say {
                    voice,
                    language,
                    text,
                } => write!(
                    xml,
                    "<Say voice=\"{}\" language=\"{}\">{}</Say>",
                    escape(voice),
                    escape(language),
                    escape(text)
                ),
                Verb::Gather(options) => write!(
                    xml,
                    "<Gather input=\"speech\" action=\"{}\" method=\"POST\" timeout=\"{}\" speechTimeout=\"auto\" language=\"{}\"/>",
                    escape(&options.action),
                    options.timeout_secs,
                    escape(&options.language)
                ),
                Verb::Redirect(url) => write!(xml, "<Redirect method=\"POST\">{}</Redirect>", escape(url)),
                Verb::Hangup => write!(xml, "<Hangup/>"),
            };
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
