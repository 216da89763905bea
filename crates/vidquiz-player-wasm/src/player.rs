use wasm_bindgen::prelude::*;

use vidquiz_engine::{
    Question, QuestionBank, QuizDefinition, QuizSession, QuizSettings, RawAnswer, RendererOptions,
    TimerToken,
};

/// One quiz playback session, driven by the host's player events.
///
/// Every event method returns the engine's effect list serialized to a
/// JS array; the host executes the effects in order (pause/play the
/// player, show/hide overlay DOM, start/cancel timers, post the
/// submission).
#[wasm_bindgen]
pub struct QuizPlayer {
    session: QuizSession,
}

#[wasm_bindgen]
impl QuizPlayer {
    /// Build a session from the quiz definition, the question batch
    /// and the settings object. `shuffle_seed` is optional; without it
    /// the wall clock seeds the presentation shuffles.
    #[wasm_bindgen(constructor)]
    pub fn new(
        definition: JsValue,
        questions: JsValue,
        settings: JsValue,
        shuffle_seed: Option<u32>,
    ) -> Result<QuizPlayer, JsValue> {
        let definition: QuizDefinition =
            serde_wasm_bindgen::from_value(definition).map_err(to_js_err)?;
        let questions: Vec<Question> =
            serde_wasm_bindgen::from_value(questions).map_err(to_js_err)?;
        let settings: QuizSettings = if settings.is_undefined() || settings.is_null() {
            QuizSettings::default()
        } else {
            serde_wasm_bindgen::from_value(settings).map_err(to_js_err)?
        };

        // SystemTime is unavailable on wasm32; seed from the JS clock.
        let seed = shuffle_seed.unwrap_or_else(|| js_sys::Date::now() as u32);
        let session = QuizSession::new(
            definition,
            QuestionBank::from_records(questions),
            settings,
            RendererOptions { seed: Some(seed) },
        );
        Ok(QuizPlayer { session })
    }

    /// Player `timeupdate`: observed playback position in seconds
    #[wasm_bindgen]
    pub fn on_time_update(&mut self, seconds: f64) -> Result<JsValue, JsValue> {
        effects_to_js(self.session.on_time_update(seconds))
    }

    /// Player `ended`
    #[wasm_bindgen]
    pub fn on_video_ended(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.session.on_video_ended())
    }

    /// The overlay reports a new raw answer state, e.g.
    /// `{type: "choice", value: "true"}` or
    /// `{type: "blanks", value: ["sky"]}`
    #[wasm_bindgen]
    pub fn on_answer_changed(&mut self, raw: JsValue) -> Result<JsValue, JsValue> {
        let raw: RawAnswer = serde_wasm_bindgen::from_value(raw).map_err(to_js_err)?;
        effects_to_js(self.session.on_answer_changed(raw))
    }

    #[wasm_bindgen]
    pub fn on_submit(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.session.on_submit())
    }

    #[wasm_bindgen]
    pub fn on_skip(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.session.on_skip())
    }

    #[wasm_bindgen]
    pub fn on_continue(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.session.on_continue())
    }

    #[wasm_bindgen]
    pub fn on_close(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.session.on_close())
    }

    /// A host timer started by a `start_timer` effect fired
    #[wasm_bindgen]
    pub fn on_timer_fired(&mut self, token: TimerToken) -> Result<JsValue, JsValue> {
        effects_to_js(self.session.on_timer_fired(token))
    }

    #[wasm_bindgen]
    pub fn on_restart(&mut self) -> Result<JsValue, JsValue> {
        effects_to_js(self.session.on_restart())
    }

    /// Score so far: `{score, total, percentage}`
    #[wasm_bindgen]
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.summary()).map_err(to_js_err)
    }

    #[wasm_bindgen]
    pub fn is_completed(&self) -> bool {
        self.session.is_completed()
    }
}

fn effects_to_js(effects: Vec<vidquiz_engine::Effect>) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&effects).map_err(to_js_err)
}

fn to_js_err(err: serde_wasm_bindgen::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}
