//! Вызов инструментов по имени с JSON-аргументами

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use crate::error::{Result, TtsError};
use super::schema::{
    tool_definitions, ToolDefinition, BATCH_TEXT_TO_SPEECH, GENERATE_SUBTITLES, GET_VOICE_INFO, LIST_VOICES,
    SAVE_AUDIO, TEXT_TO_SPEECH,
};
use super::TtsTools;

/// Разобрать аргументы инструмента; ошибка разбора считается ошибкой валидации
fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| TtsError::Validation(format!("invalid arguments for {}: {}", tool, e)))
}

/// Подставить голос из конфигурации там, где клиент его не указал
fn fill_default_voice(arguments: &mut Value, voice: &str) {
    if let Some(object) = arguments.as_object_mut() {
        object
            .entry("voice")
            .or_insert_with(|| Value::String(voice.to_string()));
    }
}

fn to_json<T: Serialize>(response: T) -> Result<Value> {
    Ok(serde_json::to_value(response)?)
}

impl TtsTools {
    /// Описания инструментов с лимитами этого экземпляра
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        tool_definitions(self.config())
    }

    /// Вызвать инструмент и вернуть результат или `{"error": {...}}`
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Value {
        log::debug!("Tool call: {}", name);
        match self.dispatch(name, arguments).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Tool {} failed with code {}: {}", name, e.code(), e);
                e.to_envelope().into_response()
            }
        }
    }

    async fn dispatch(&self, name: &str, mut arguments: Value) -> Result<Value> {
        let default_voice = self.config().default_voice.clone();

        match name {
            TEXT_TO_SPEECH => {
                fill_default_voice(&mut arguments, &default_voice);
                to_json(self.text_to_speech(parse_arguments(name, arguments)?).await?)
            }
            BATCH_TEXT_TO_SPEECH => {
                if let Some(segments) = arguments.get_mut("segments").and_then(Value::as_array_mut) {
                    for segment in segments {
                        fill_default_voice(segment, &default_voice);
                    }
                }
                to_json(self.batch_text_to_speech(parse_arguments(name, arguments)?).await?)
            }
            LIST_VOICES => to_json(self.list_voices(parse_arguments(name, arguments)?).await?),
            GET_VOICE_INFO => to_json(self.get_voice_info(parse_arguments(name, arguments)?).await?),
            SAVE_AUDIO => to_json(self.save_audio(parse_arguments(name, arguments)?).await?),
            GENERATE_SUBTITLES => {
                fill_default_voice(&mut arguments, &default_voice);
                to_json(self.generate_subtitles(parse_arguments(name, arguments)?).await?)
            }
            unknown => Err(TtsError::UnknownTool(unknown.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::models::TextToSpeechRequest;

    #[test]
    fn test_null_arguments_become_empty_object() {
        let request: crate::models::ListVoicesRequest = parse_arguments(LIST_VOICES, Value::Null).unwrap();
        assert!(!request.has_filters());
    }

    #[test]
    fn test_bad_arguments_are_validation_errors() {
        let result: Result<TextToSpeechRequest> = parse_arguments(TEXT_TO_SPEECH, json!({ "voice": 5 }));
        match result {
            Err(e @ TtsError::Validation(_)) => assert_eq!(e.code(), 1003),
            other => panic!("unexpected result: {:?}", other.map(|r| r.segment)),
        }
    }

    #[test]
    fn test_default_voice_only_fills_missing() {
        let mut args = json!({ "text": "a" });
        fill_default_voice(&mut args, "en-GB-SoniaNeural");
        assert_eq!(args["voice"], "en-GB-SoniaNeural");

        let mut args = json!({ "text": "a", "voice": "ja-JP-NanamiNeural" });
        fill_default_voice(&mut args, "en-GB-SoniaNeural");
        assert_eq!(args["voice"], "ja-JP-NanamiNeural");
    }
}
