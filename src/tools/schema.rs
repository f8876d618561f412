//! Описания инструментов в виде JSON Schema

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::config::TtsToolsConfig;

pub const TEXT_TO_SPEECH: &str = "text_to_speech";
pub const BATCH_TEXT_TO_SPEECH: &str = "batch_text_to_speech";
pub const LIST_VOICES: &str = "list_voices";
pub const GET_VOICE_INFO: &str = "get_voice_info";
pub const SAVE_AUDIO: &str = "save_audio";
pub const GENERATE_SUBTITLES: &str = "generate_subtitles";

/// Описание одного инструмента
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

fn segment_properties(config: &TtsToolsConfig) -> Value {
    json!({
        "text": {
            "type": "string",
            "minLength": 1,
            "maxLength": config.max_text_length,
            "description": "Text to synthesize"
        },
        "voice": {
            "type": "string",
            "default": config.default_voice,
            "description": "Voice full name or short name"
        },
        "rate": {
            "type": "string",
            "pattern": "^[+-]?\\d+%$",
            "default": "+0%",
            "description": "Speaking rate adjustment"
        },
        "volume": {
            "type": "string",
            "pattern": "^[+-]?\\d+%$",
            "default": "+0%",
            "description": "Volume adjustment"
        },
        "pitch": {
            "type": "string",
            "pattern": "^[+-]?\\d+Hz$",
            "default": "+0Hz",
            "description": "Pitch adjustment"
        }
    })
}

fn audio_format_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["mp3", "wav", "ogg"],
        "default": "mp3"
    })
}

fn boundary_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["WordBoundary", "SentenceBoundary"],
        "default": "SentenceBoundary"
    })
}

/// Описания всех инструментов с лимитами из конфигурации
pub fn tool_definitions(config: &TtsToolsConfig) -> Vec<ToolDefinition> {
    let mut single = segment_properties(config);
    single["format"] = audio_format_schema();
    single["inline"] = json!({
        "type": "boolean",
        "default": false,
        "description": "Return base64 audio instead of writing a file"
    });

    let mut segment = segment_properties(config);
    segment["boundary"] = boundary_schema();

    vec![
        ToolDefinition::new(
            TEXT_TO_SPEECH,
            "Convert text to speech and save it as an audio file",
            json!({
                "type": "object",
                "properties": single,
                "required": ["text"]
            }),
        ),
        ToolDefinition::new(
            BATCH_TEXT_TO_SPEECH,
            "Synthesize several independently configured segments into one audio file",
            json!({
                "type": "object",
                "properties": {
                    "segments": {
                        "type": "array",
                        "minItems": 1,
                        "maxItems": config.max_segments,
                        "items": {
                            "type": "object",
                            "properties": segment,
                            "required": ["text"]
                        }
                    },
                    "format": audio_format_schema(),
                    "output_filename": {
                        "type": "string",
                        "description": "Output file name relative to the output directory"
                    }
                },
                "required": ["segments"]
            }),
        ),
        ToolDefinition::new(
            LIST_VOICES,
            "List available voices, optionally filtered by locale, gender or name",
            json!({
                "type": "object",
                "properties": {
                    "locale": { "type": "string", "description": "Locale such as en-US" },
                    "gender": { "type": "string", "enum": ["Male", "Female"] },
                    "name_pattern": { "type": "string", "description": "Case-insensitive substring of the voice name" }
                }
            }),
        ),
        ToolDefinition::new(
            GET_VOICE_INFO,
            "Get details of a single voice",
            json!({
                "type": "object",
                "properties": {
                    "voice_name": { "type": "string", "description": "Voice full name or short name" }
                },
                "required": ["voice_name"]
            }),
        ),
        ToolDefinition::new(
            SAVE_AUDIO,
            "Save base64-encoded audio to a file",
            json!({
                "type": "object",
                "properties": {
                    "audio_data": { "type": "string", "description": "Base64-encoded audio" },
                    "filename": { "type": "string" },
                    "format": audio_format_schema()
                },
                "required": ["audio_data", "filename"]
            }),
        ),
        ToolDefinition::new(
            GENERATE_SUBTITLES,
            "Synthesize text and derive SRT subtitles from word or sentence boundaries",
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "minLength": 1 },
                    "voice": { "type": "string", "default": config.default_voice },
                    "subtitle_format": { "type": "string", "enum": ["srt"], "default": "srt" },
                    "boundary_type": boundary_schema()
                },
                "required": ["text"]
            }),
        ),
    ]
}
