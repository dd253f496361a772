//! Story configuration: genre tags and style sliders.
//!
//! Genre is a closed, validated enum rather than free-form metadata, so
//! an invalid genre is rejected at story-creation time instead of
//! surfacing later inside a generation prompt.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Validated story genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Fantasy,
    SciFi,
    Mystery,
    Romance,
    Adventure,
    Horror,
    SliceOfLife,
}

impl Genre {
    /// Stable string tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fantasy => "fantasy",
            Self::SciFi => "sci_fi",
            Self::Mystery => "mystery",
            Self::Romance => "romance",
            Self::Adventure => "adventure",
            Self::Horror => "horror",
            Self::SliceOfLife => "slice_of_life",
        }
    }

    /// One-line genre context fed into generation instructions.
    pub fn context_line(&self) -> &'static str {
        match self {
            Self::Fantasy => "The story is a fantasy: magic, old places, and quiet wonder are at home here.",
            Self::SciFi => "The story is science fiction: technology, distance, and consequence shape events.",
            Self::Mystery => "The story is a mystery: details matter, and something is always slightly off.",
            Self::Romance => "The story is a romance: attention stays on what the characters feel and almost say.",
            Self::Adventure => "The story is an adventure: momentum, risk, and terrain drive each scene.",
            Self::Horror => "The story is horror: dread builds slowly and the ordinary turns wrong.",
            Self::SliceOfLife => "The story is slice-of-life: small moments carry the weight.",
        }
    }
}

impl Default for Genre {
    fn default() -> Self {
        Self::Fantasy
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "fantasy" => Ok(Self::Fantasy),
            "sci_fi" | "scifi" | "science_fiction" => Ok(Self::SciFi),
            "mystery" => Ok(Self::Mystery),
            "romance" => Ok(Self::Romance),
            "adventure" => Ok(Self::Adventure),
            "horror" => Ok(Self::Horror),
            "slice_of_life" => Ok(Self::SliceOfLife),
            other => Err(format!("unknown genre: {other}")),
        }
    }
}

/// The seven 0-9 style sliders chosen at story creation.
///
/// Values are clamped to 9 on construction; each slider renders into a
/// natural-language instruction via [`StyleSettings::directive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSettings {
    pub tone: u8,
    pub length: u8,
    pub mood: u8,
    pub dialogue: u8,
    pub surprise: u8,
    pub emotion: u8,
    pub plot_pace: u8,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            tone: 5,
            length: 5,
            mood: 5,
            dialogue: 5,
            surprise: 5,
            emotion: 5,
            plot_pace: 5,
        }
    }
}

/// Render one slider as a low/mid/high instruction.
fn band(value: u8, low: &str, mid: &str, high: &str) -> String {
    let pick = match value {
        0..=3 => low,
        4..=6 => mid,
        _ => high,
    };
    pick.to_string()
}

impl StyleSettings {
    /// Create settings, clamping every slider into 0-9.
    #[allow(clippy::too_many_arguments)]
    pub fn new(tone: u8, length: u8, mood: u8, dialogue: u8, surprise: u8, emotion: u8, plot_pace: u8) -> Self {
        Self {
            tone: tone.min(9),
            length: length.min(9),
            mood: mood.min(9),
            dialogue: dialogue.min(9),
            surprise: surprise.min(9),
            emotion: emotion.min(9),
            plot_pace: plot_pace.min(9),
        }
    }

    /// Render the sliders as a block of natural-language instructions
    /// for the passage generator.
    pub fn directive(&self) -> String {
        let lines = [
            band(
                self.tone,
                "Keep the tone plain and grounded.",
                "Keep the tone warm but restrained.",
                "Let the tone be lyrical and vivid.",
            ),
            band(
                self.length,
                "Write one or two short sentences.",
                "Write two to three sentences.",
                "Write a full paragraph of four to five sentences.",
            ),
            band(
                self.mood,
                "The mood is dark and heavy.",
                "The mood is balanced, neither grim nor light.",
                "The mood is bright and hopeful.",
            ),
            band(
                self.dialogue,
                "Avoid dialogue entirely.",
                "A short line of dialogue is allowed if it fits.",
                "Favor dialogue; let characters speak.",
            ),
            band(
                self.surprise,
                "Stay predictable; follow the established thread.",
                "A small twist is welcome but not required.",
                "Introduce an unexpected turn.",
            ),
            band(
                self.emotion,
                "Keep emotion understated.",
                "Show emotion through action, not statement.",
                "Make the emotional stakes explicit and strong.",
            ),
            band(
                self.plot_pace,
                "Move the plot slowly; linger on detail.",
                "Advance the plot at a steady pace.",
                "Drive the plot forward quickly.",
            ),
        ];
        lines.join("\n")
    }

    /// Short pacing hint for prompt generation.
    pub fn pace_hint(&self) -> &'static str {
        match self.plot_pace {
            0..=3 => "Ask about detail, atmosphere, or a small moment.",
            4..=6 => "Ask something that moves the scene forward.",
            _ => "Ask something that forces a decision or a change.",
        }
    }

    /// Output budget for passage generation, scaled by the length slider.
    pub fn max_output_tokens(&self) -> u32 {
        120 + u32::from(self.length) * 40
    }
}
