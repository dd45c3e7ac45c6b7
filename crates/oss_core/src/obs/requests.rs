//! Typed wrappers for the requests this tool issues.

use serde::Deserialize;
use serde_json::{json, Value};

use super::client::{ObsClient, ObsResult};

/// Filter kind of the async video-delay filter.
pub const VIDEO_DELAY_FILTER_KIND: &str = "async_delay_filter";

pub const MEDIA_ACTION_PLAY: &str = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_PLAY";
pub const MEDIA_ACTION_PAUSE: &str = "OBS_WEBSOCKET_MEDIA_INPUT_ACTION_PAUSE";

/// Response of `GetVersion`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub obs_version: String,
    pub obs_web_socket_version: String,
}

/// One entry of `GetSceneItemList`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItem {
    pub source_name: String,
    #[serde(default)]
    pub input_kind: Option<String>,
    pub scene_item_id: i64,
    #[serde(default)]
    pub scene_item_transform: Option<SceneItemTransform>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItemTransform {
    #[serde(default)]
    pub source_width: f64,
    #[serde(default)]
    pub source_height: f64,
}

/// One entry of `GetSourceFilterList`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFilter {
    pub filter_name: String,
    pub filter_kind: String,
    #[serde(default)]
    pub filter_settings: Value,
}

impl SourceFilter {
    /// The `delay_ms` setting, when this is a delay filter.
    pub fn delay_ms(&self) -> Option<f64> {
        self.filter_settings.get("delay_ms").and_then(Value::as_f64)
    }
}

/// Response of `GetInputSettings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSettings {
    pub input_kind: String,
    #[serde(default)]
    pub input_settings: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneItemListResponse {
    scene_items: Vec<SceneItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceFilterListResponse {
    filters: Vec<SourceFilter>,
}

impl ObsClient {
    pub async fn get_version(&self) -> ObsResult<VersionInfo> {
        let data = self.call("GetVersion", None).await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn get_scene_item_list(&self, scene_name: &str) -> ObsResult<Vec<SceneItem>> {
        let data = self
            .call("GetSceneItemList", Some(json!({ "sceneName": scene_name })))
            .await?;
        let response: SceneItemListResponse = serde_json::from_value(data)?;
        Ok(response.scene_items)
    }

    pub async fn get_source_filter_list(
        &self,
        source_name: &str,
    ) -> ObsResult<Vec<SourceFilter>> {
        let data = self
            .call(
                "GetSourceFilterList",
                Some(json!({ "sourceName": source_name })),
            )
            .await?;
        let response: SourceFilterListResponse = serde_json::from_value(data)?;
        Ok(response.filters)
    }

    /// Current audio sync offset of an input, in milliseconds.
    pub async fn get_input_audio_sync_offset(&self, input_name: &str) -> ObsResult<f64> {
        let data = self
            .call(
                "GetInputAudioSyncOffset",
                Some(json!({ "inputName": input_name })),
            )
            .await?;
        Ok(data
            .get("inputAudioSyncOffset")
            .and_then(Value::as_f64)
            .unwrap_or(0.0))
    }

    pub async fn set_input_audio_sync_offset(
        &self,
        input_name: &str,
        offset_ms: i64,
    ) -> ObsResult<()> {
        self.call(
            "SetInputAudioSyncOffset",
            Some(json!({
                "inputName": input_name,
                "inputAudioSyncOffset": offset_ms,
            })),
        )
        .await?;
        Ok(())
    }

    /// Whether the source is currently shown in the program output.
    pub async fn get_source_active(&self, source_name: &str) -> ObsResult<bool> {
        let data = self
            .call("GetSourceActive", Some(json!({ "sourceName": source_name })))
            .await?;
        Ok(data
            .get("videoShowing")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Fetch a base64 screenshot of a source.
    pub async fn get_source_screenshot(
        &self,
        source_name: &str,
        image_format: &str,
        width: u32,
        height: u32,
        compression_quality: Option<i64>,
    ) -> ObsResult<String> {
        let mut request = json!({
            "sourceName": source_name,
            "imageFormat": image_format,
            "imageWidth": width,
            "imageHeight": height,
        });
        if let Some(quality) = compression_quality {
            request["imageCompressionQuality"] = json!(quality);
        }
        let data = self.call("GetSourceScreenshot", Some(request)).await?;
        Ok(data
            .get("imageData")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    pub async fn create_source_filter(
        &self,
        source_name: &str,
        filter_name: &str,
        filter_kind: &str,
        filter_settings: Value,
    ) -> ObsResult<()> {
        self.call(
            "CreateSourceFilter",
            Some(json!({
                "sourceName": source_name,
                "filterName": filter_name,
                "filterKind": filter_kind,
                "filterSettings": filter_settings,
            })),
        )
        .await?;
        Ok(())
    }

    pub async fn set_source_filter_settings(
        &self,
        source_name: &str,
        filter_name: &str,
        filter_settings: Value,
    ) -> ObsResult<()> {
        self.call(
            "SetSourceFilterSettings",
            Some(json!({
                "sourceName": source_name,
                "filterName": filter_name,
                "filterSettings": filter_settings,
                "overlay": true,
            })),
        )
        .await?;
        Ok(())
    }

    pub async fn get_input_settings(&self, input_name: &str) -> ObsResult<InputSettings> {
        let data = self
            .call("GetInputSettings", Some(json!({ "inputName": input_name })))
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Overlay new settings onto an input's existing ones.
    pub async fn set_input_settings(
        &self,
        input_name: &str,
        input_settings: Value,
    ) -> ObsResult<()> {
        self.call(
            "SetInputSettings",
            Some(json!({
                "inputName": input_name,
                "inputSettings": input_settings,
                "overlay": true,
            })),
        )
        .await?;
        Ok(())
    }

    pub async fn trigger_media_input_action(
        &self,
        input_name: &str,
        media_action: &str,
    ) -> ObsResult<()> {
        self.call(
            "TriggerMediaInputAction",
            Some(json!({
                "inputName": input_name,
                "mediaAction": media_action,
            })),
        )
        .await?;
        Ok(())
    }

    pub async fn get_studio_mode_enabled(&self) -> ObsResult<bool> {
        let data = self.call("GetStudioModeEnabled", None).await?;
        Ok(data
            .get("studioModeEnabled")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    pub async fn get_current_preview_scene(&self) -> ObsResult<String> {
        let data = self.call("GetCurrentPreviewScene", None).await?;
        Ok(data
            .get("currentPreviewSceneName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    pub async fn get_current_program_scene(&self) -> ObsResult<String> {
        let data = self.call("GetCurrentProgramScene", None).await?;
        Ok(data
            .get("currentProgramSceneName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Set only the bottom crop of a scene item, leaving the rest of the
    /// transform untouched.
    pub async fn set_scene_item_crop_bottom(
        &self,
        scene_name: &str,
        scene_item_id: i64,
        crop_bottom: u32,
    ) -> ObsResult<()> {
        self.call(
            "SetSceneItemTransform",
            Some(json!({
                "sceneName": scene_name,
                "sceneItemId": scene_item_id,
                "sceneItemTransform": { "cropBottom": crop_bottom },
            })),
        )
        .await?;
        Ok(())
    }
}
