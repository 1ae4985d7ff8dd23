use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The prompt drafting form. Every field is free text and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptFormData {
    /// Seed idea the other fields are expanded from.
    pub idea: String,
    pub subject: String,
    pub age: String,
    pub skin_tone: String,
    pub face: String,
    pub hair: String,
    pub clothing: String,
    pub origin: String,
    pub accessories: String,
    pub action: String,
    pub expression: String,
    pub place: String,
    pub time: String,
    pub camera_movement: String,
    pub lighting: String,
    pub video_style: String,
    pub video_quality: String,
    pub mood: String,
    pub audio: String,
    pub spoken_line: String,
    pub extra_detail: String,
    /// Things the video should avoid.
    pub negative_prompt: String,
}

/// Fields returned by an idea expansion. Absent means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpandedFields {
    pub subject: Option<String>,
    pub age: Option<String>,
    pub skin_tone: Option<String>,
    pub face: Option<String>,
    pub hair: Option<String>,
    pub clothing: Option<String>,
    pub origin: Option<String>,
    pub accessories: Option<String>,
    pub action: Option<String>,
    pub expression: Option<String>,
    pub place: Option<String>,
    pub time: Option<String>,
    pub camera_movement: Option<String>,
    pub lighting: Option<String>,
    pub video_style: Option<String>,
    pub video_quality: Option<String>,
    pub mood: Option<String>,
    pub audio: Option<String>,
    pub spoken_line: Option<String>,
    pub extra_detail: Option<String>,
}

/// Wire names and descriptions of the expansion schema, in form order.
/// Names match the camelCase serde names above.
pub const EXPAND_FIELDS: [(&str, &str); 20] = [
    ("subject", "The main character or object."),
    ("age", "Age of the subject, if relevant."),
    ("skinTone", "Skin tone of the subject."),
    ("face", "Detailed description of the subject's face."),
    ("hair", "Hair style and color of the subject."),
    ("clothing", "Clothing the subject wears."),
    ("origin", "Country of origin or ethnicity of the subject."),
    ("accessories", "Accessories the subject wears."),
    ("action", "What the subject is doing."),
    ("expression", "Facial expression or emotion of the subject."),
    ("place", "Location or setting of the video."),
    ("time", "Time of day (morning, noon, night, golden hour)."),
    ("cameraMovement", "Camera movement (panning, zoom, etc.)."),
    ("lighting", "Kind of lighting (soft, dramatic, etc.)."),
    ("videoStyle", "Visual style of the video (cinematic, realistic, etc.)."),
    ("videoQuality", "Video quality (4K, HD, high detail)."),
    ("mood", "Mood or atmosphere of the video (cheerful, mysterious)."),
    ("audio", "Description of sound or background music."),
    ("spokenLine", "Dialogue or line spoken, if any."),
    ("extraDetail", "Any other important detail."),
];

fn overwrite(slot: &mut String, value: Option<String>) {
    if let Some(v) = value
        && !v.trim().is_empty()
    {
        *slot = v;
    }
}

impl PromptFormData {
    /// Apply an expansion. Only populated fields override; `idea` and
    /// `negative_prompt` are never touched.
    pub fn merge(&mut self, expanded: ExpandedFields) {
        overwrite(&mut self.subject, expanded.subject);
        overwrite(&mut self.age, expanded.age);
        overwrite(&mut self.skin_tone, expanded.skin_tone);
        overwrite(&mut self.face, expanded.face);
        overwrite(&mut self.hair, expanded.hair);
        overwrite(&mut self.clothing, expanded.clothing);
        overwrite(&mut self.origin, expanded.origin);
        overwrite(&mut self.accessories, expanded.accessories);
        overwrite(&mut self.action, expanded.action);
        overwrite(&mut self.expression, expanded.expression);
        overwrite(&mut self.place, expanded.place);
        overwrite(&mut self.time, expanded.time);
        overwrite(&mut self.camera_movement, expanded.camera_movement);
        overwrite(&mut self.lighting, expanded.lighting);
        overwrite(&mut self.video_style, expanded.video_style);
        overwrite(&mut self.video_quality, expanded.video_quality);
        overwrite(&mut self.mood, expanded.mood);
        overwrite(&mut self.audio, expanded.audio);
        overwrite(&mut self.spoken_line, expanded.spoken_line);
        overwrite(&mut self.extra_detail, expanded.extra_detail);
    }

    /// Descriptive context block with every field interpolated.
    pub fn to_context(&self) -> String {
        let dialogue = if self.spoken_line.trim().is_empty() {
            "No dialogue.".to_string()
        } else {
            format!("The subject says: \"{}\"", self.spoken_line)
        };
        format!(
            "Create a video prompt from the following details:\n\
             - Subject: {subject}\n\
             - Subject details: age {age}, skin {skin}, face {face}, hair {hair}, clothing {clothing}, origin {origin}, accessories {accessories}\n\
             - Action & emotion: doing '{action}' with the expression '{expression}'\n\
             - Setting: at {place} during {time}\n\
             - Cinematography: camera movement {camera}, lighting {lighting}\n\
             - Style & mood: {style} video style at {quality} quality, creating a {mood} mood\n\
             - Audio: with sound/music {audio}.\n\
             - Dialogue: {dialogue}\n\
             - Extra detail: {extra}\n\
             - Avoid: {negative}\n",
            subject = self.subject,
            age = self.age,
            skin = self.skin_tone,
            face = self.face,
            hair = self.hair,
            clothing = self.clothing,
            origin = self.origin,
            accessories = self.accessories,
            action = self.action,
            expression = self.expression,
            place = self.place,
            time = self.time,
            camera = self.camera_movement,
            lighting = self.lighting,
            style = self.video_style,
            quality = self.video_quality,
            mood = self.mood,
            audio = self.audio,
            extra = self.extra_detail,
            negative = self.negative_prompt,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_match_serde_names() {
        let all = serde_json::to_value(ExpandedFields {
            subject: Some(String::new()),
            age: Some(String::new()),
            skin_tone: Some(String::new()),
            face: Some(String::new()),
            hair: Some(String::new()),
            clothing: Some(String::new()),
            origin: Some(String::new()),
            accessories: Some(String::new()),
            action: Some(String::new()),
            expression: Some(String::new()),
            place: Some(String::new()),
            time: Some(String::new()),
            camera_movement: Some(String::new()),
            lighting: Some(String::new()),
            video_style: Some(String::new()),
            video_quality: Some(String::new()),
            mood: Some(String::new()),
            audio: Some(String::new()),
            spoken_line: Some(String::new()),
            extra_detail: Some(String::new()),
        })
        .unwrap();
        let obj = all.as_object().unwrap();
        assert_eq!(obj.len(), EXPAND_FIELDS.len());
        for (name, _) in EXPAND_FIELDS {
            assert!(obj.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn merge_only_overrides_populated() {
        let mut form = PromptFormData {
            idea: "astronaut on a beach".into(),
            subject: "old".into(),
            hair: "short".into(),
            negative_prompt: "blur".into(),
            ..Default::default()
        };
        form.merge(ExpandedFields {
            subject: Some("an astronaut".into()),
            hair: Some("   ".into()),
            place: Some("a beach".into()),
            ..Default::default()
        });
        assert_eq!(form.idea, "astronaut on a beach");
        assert_eq!(form.subject, "an astronaut");
        assert_eq!(form.hair, "short");
        assert_eq!(form.place, "a beach");
        assert_eq!(form.negative_prompt, "blur");
    }

    #[test]
    fn idea_in_response_is_ignored() {
        let expanded: ExpandedFields =
            serde_json::from_str(r#"{"idea":"hijacked","subject":"s"}"#).unwrap();
        let mut form = PromptFormData {
            idea: "X".into(),
            ..Default::default()
        };
        form.merge(expanded);
        assert_eq!(form.idea, "X");
        assert_eq!(form.subject, "s");
    }

    #[test]
    fn context_mentions_dialogue_or_its_absence() {
        let mut form = PromptFormData {
            subject: "a fox".into(),
            negative_prompt: "text overlays".into(),
            ..Default::default()
        };
        let ctx = form.to_context();
        assert!(ctx.contains("- Subject: a fox"));
        assert!(ctx.contains("- Dialogue: No dialogue."));
        assert!(ctx.contains("- Avoid: text overlays"));

        form.spoken_line = "Hello!".into();
        assert!(form.to_context().contains(r#"The subject says: "Hello!""#));
    }
}
