//! TwiML documents — the markup webhook replies the provider executes.
//!
//! Assembled by hand rather than through a vendor SDK; the verb set is the
//! handful this relay actually speaks: Say, Play, Pause, Gather, Hangup,
//! and the messaging-side Message.

use std::fmt::Write as _;

/// Voice used for provider text-to-speech throughout the IVR.
pub const IVR_VOICE: &str = "Polly.Emma";

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Wrap text in the prosody envelope used for provider text-to-speech.
/// The inner text is XML-escaped; the envelope itself is emitted verbatim.
pub fn prosody(text: &str) -> String {
    format!(
        "<speak><prosody rate='medium' pitch='high' volume='medium'>{}</prosody></speak>",
        escape_xml(text)
    )
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

enum Verb {
    /// `content` is final document text: already escaped, or deliberate SSML.
    Say { content: String, voice: String },
    Play { url: String },
    Pause { length: u32 },
    Gather(Gather),
    Hangup,
}

/// A single-digit capture menu. Input is posted to `action` keyed by the
/// same call id; on timeout the provider falls through to whatever verbs
/// follow the gather.
pub struct Gather {
    num_digits: u32,
    timeout_secs: u32,
    action: String,
    prompt: Vec<Verb>,
}

impl Gather {
    pub fn new(num_digits: u32, timeout_secs: u32, action: impl Into<String>) -> Self {
        Self {
            num_digits,
            timeout_secs,
            action: action.into(),
            prompt: Vec::new(),
        }
    }

    /// Nested prompt spoken while waiting for input.
    pub fn say_ssml(mut self, content: impl Into<String>, voice: &str) -> Self {
        self.prompt.push(Verb::Say {
            content: content.into(),
            voice: voice.to_string(),
        });
        self
    }
}

/// Builder for a voice response document.
#[derive(Default)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak plain text (XML-escaped) with the given voice.
    pub fn say(mut self, text: &str, voice: &str) -> Self {
        self.verbs.push(Verb::Say {
            content: escape_xml(text),
            voice: voice.to_string(),
        });
        self
    }

    /// Speak pre-rendered SSML (see [`prosody`]) with the given voice.
    pub fn say_ssml(mut self, content: impl Into<String>, voice: &str) -> Self {
        self.verbs.push(Verb::Say {
            content: content.into(),
            voice: voice.to_string(),
        });
        self
    }

    pub fn play(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Play { url: url.into() });
        self
    }

    pub fn pause(mut self, length: u32) -> Self {
        self.verbs.push(Verb::Pause { length });
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from(XML_HEADER);
        out.push_str("<Response>");
        for verb in &self.verbs {
            render_verb(&mut out, verb);
        }
        out.push_str("</Response>");
        out
    }
}

fn render_verb(out: &mut String, verb: &Verb) {
    match verb {
        Verb::Say { content, voice } => {
            let _ = write!(out, r#"<Say voice="{}">{}</Say>"#, escape_xml(voice), content);
        }
        Verb::Play { url } => {
            let _ = write!(out, "<Play>{}</Play>", escape_xml(url));
        }
        Verb::Pause { length } => {
            let _ = write!(out, r#"<Pause length="{length}"/>"#);
        }
        Verb::Gather(g) => {
            let _ = write!(
                out,
                r#"<Gather numDigits="{}" timeout="{}" action="{}" method="POST">"#,
                g.num_digits,
                g.timeout_secs,
                escape_xml(&g.action)
            );
            for nested in &g.prompt {
                render_verb(out, nested);
            }
            out.push_str("</Gather>");
        }
        Verb::Hangup => out.push_str("<Hangup/>"),
    }
}

/// Builder for a messaging response document.
#[derive(Default)]
pub struct MessagingResponse {
    messages: Vec<String>,
}

impl MessagingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty response: acknowledge the webhook, reply with nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn message(mut self, text: &str) -> Self {
        self.messages.push(escape_xml(text));
        self
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from(XML_HEADER);
        out.push_str("<Response>");
        for body in &self.messages {
            let _ = write!(out, "<Message>{body}</Message>");
        }
        out.push_str("</Response>");
        out
    }
}
