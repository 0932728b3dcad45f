//! Test utilities for fidelity pipeline tests.
//!
//! Provides a scripted mock driver and JSON fixtures shaped like real
//! stage responses.

// Each test binary compiles its own copy; not every binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use hokusai_core::{GenerateRequest, GenerateResponse, Input, Output};
use hokusai_error::{BackendError, HokusaiResult};
use hokusai_interface::HokusaiDriver;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted backend response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this text as the model output.
    Success(String),
    /// Fail with a backend error carrying this message.
    Error(String),
}

/// Scripted driver: pops one response per call, records every prompt.
pub struct MockDriver {
    responses: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockDriver {
    pub fn new_sequence(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt sent to the driver, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl HokusaiDriver for MockDriver {
    async fn generate(&self, req: &GenerateRequest) -> HokusaiResult<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let prompt = req
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|input| match input {
                Input::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(MockResponse::Success(text)) => Ok(GenerateResponse {
                outputs: vec![Output::Text(text)],
            }),
            Some(MockResponse::Error(message)) => Err(BackendError::new(message).into()),
            None => Err(BackendError::new("mock driver response sequence exhausted").into()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Architect response fixture. `canary` lands in the extracted facts only,
/// never in the narrative, so isolation tests can track it precisely.
pub fn architect_json(canary: Option<&str>) -> String {
    let secret = canary.unwrap_or("her sister's last sketchbook");
    format!(
        r#"{{
            "story": "Mina arrives early to the art room every morning to repaint the same skyline. Jun watches from the doorway, trying to find the courage to show her his own work before the school exhibition closes entries on Friday.",
            "summary": "Two classmates circle each other in the art room before an exhibition deadline.",
            "character_motivations": {{
                "Mina": {{
                    "goal": "finish the skyline before Friday",
                    "motivation": "it was promised over {secret}",
                    "obstacle": "she repaints the same corner every day"
                }},
                "Jun": {{
                    "goal": "show Mina his portfolio",
                    "motivation": "her opinion is the only one he trusts",
                    "obstacle": "fear that she will laugh"
                }}
            }},
            "key_conflicts": ["Jun's fear of rejection against the closing deadline", "Mina against her own perfectionism"],
            "plot_points": ["Mina repaints the skyline", "Jun lingers at the door", "the entry deadline is announced", "Jun drops his portfolio", "Mina picks it up"]
        }}"#
    )
}

/// A visual description comfortably above the 150-character minimum.
pub fn long_visual(tag: &str) -> String {
    format!(
        "Morning light slants through the tall art-room windows while Mina leans over \
         a desk stacked with sketchbooks, charcoal smudged along her knuckles, and Jun \
         hesitates in the doorway clutching a folder to his chest ({tag})."
    )
}

/// Scripter response fixture. `tag` is threaded into every visual
/// description so revisions are textually distinguishable.
pub fn script_json(tag: &str) -> String {
    let visual_one = long_visual(tag);
    let visual_two = long_visual(&format!("{tag}, closer"));
    format!(
        r#"{{
            "characters": [
                {{"name": "Mina", "visual_description": "Short dark hair pinned back with a brass clip, paint-streaked apron over her uniform, deliberate unhurried movements"}},
                {{"name": "Jun", "visual_description": "Tall and narrow-shouldered, tie always slightly loose, carries a gray portfolio folder everywhere he goes"}}
            ],
            "panels": [
                {{
                    "panel_number": 1,
                    "visual_description": "{visual_one}",
                    "dialogue": [{{"character": "Jun", "text": "You're here early again."}}],
                    "shot_type": "Wide Shot",
                    "environment": "school art room"
                }},
                {{
                    "panel_number": 2,
                    "visual_description": "{visual_two}",
                    "dialogue": [{{"character": "Mina", "text": "The light is better before class."}}],
                    "shot_type": "Medium Shot",
                    "environment": "school art room"
                }}
            ]
        }}"#
    )
}

/// Blind reader response fixture.
pub fn reader_json(confidence: f32) -> String {
    format!(
        r#"{{
            "reconstructed_story": "Two students share an art room in the early morning. The boy in the doorway wants to approach the girl who paints, but something holds him back.",
            "inferred_motivations": {{
                "Mina": {{"apparent_goal": "finish a painting she cares about", "confidence": 70}},
                "Jun": {{"apparent_goal": "talk to Mina", "confidence": 60}}
            }},
            "inferred_conflicts": ["Jun's hesitation at the doorway"],
            "unclear_elements": ["why the painting matters to Mina"],
            "overall_confidence": {confidence}
        }}"#
    )
}

/// Evaluator response fixture with one critical motivation gap when the
/// score falls below 80.
pub fn evaluator_json(score: f32) -> String {
    if score >= 80.0 {
        format!(
            r#"{{
                "fidelity_score": {score},
                "gaps": [],
                "critique": "The panels carry the story cleanly. No revision needed."
            }}"#
        )
    } else {
        format!(
            r#"{{
                "fidelity_score": {score},
                "gaps": [
                    {{
                        "category": "motivation",
                        "original_element": "Mina paints to keep a promise",
                        "reader_interpretation": "NOT DETECTED",
                        "severity": "critical",
                        "suggested_fix": "Add a close-up of the dedication page taped inside her paint box"
                    }}
                ],
                "critique": "The reader never learns why the skyline matters to Mina. Make the promise visible inside a panel."
            }}"#
        )
    }
}
