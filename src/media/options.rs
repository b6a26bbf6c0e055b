use super::error::PickerError;
use super::types::MediaTypeFilter;
use serde::{Deserialize, Serialize};

/// Caller-supplied request options. Every field has an explicit default so a
/// bare `SelectionOptions::default()` asks for a single image with no extras.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectionOptions {
    /// Let the platform present a crop/edit step before returning
    pub allows_editing: bool,
    /// Crop aspect ratio as width:height, only consulted when editing
    pub aspect: Option<(f64, f64)>,
    /// Lossy compression hint in `[0.0, 1.0]`
    pub quality: Option<f64>,
    pub allows_multiple_selection: bool,
    pub media_types: MediaTypeFilter,
    pub exif: bool,
    pub base64: bool,
}

impl SelectionOptions {
    pub fn new(media_types: MediaTypeFilter) -> Self {
        Self {
            media_types,
            ..Self::default()
        }
    }

    /// Checks option values without touching the platform.
    ///
    /// Out-of-range quality fails rather than being clamped. An aspect ratio
    /// given without `allows_editing` is ignored.
    pub fn validate(&self) -> Result<(), PickerError> {
        if let Some(quality) = self.quality {
            if !(0.0..=1.0).contains(&quality) {
                return Err(PickerError::InvalidOption(format!(
                    "quality must be within [0.0, 1.0], got {quality}"
                )));
            }
        }

        if self.allows_editing {
            if let Some((width, height)) = self.aspect {
                let positive = |v: f64| v.is_finite() && v > 0.0;
                if !positive(width) || !positive(height) {
                    return Err(PickerError::InvalidOption(format!(
                        "aspect must be two positive numbers, got [{width}, {height}]"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Aspect ratio that actually applies to this request.
    pub fn effective_aspect(&self) -> Option<(f64, f64)> {
        if self.allows_editing {
            self.aspect
        } else {
            None
        }
    }
}

/// Request shape for environments that only offer a file input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFileBrowserOptions {
    pub media_types: MediaTypeFilter,
    /// Ask for direct camera capture instead of browsing
    #[serde(default)]
    pub capture: bool,
    pub allows_multiple_selection: bool,
}

impl OpenFileBrowserOptions {
    /// File inputs cannot ask for EXIF or inline content.
    pub fn to_selection(self) -> SelectionOptions {
        SelectionOptions {
            allows_multiple_selection: self.allows_multiple_selection,
            media_types: self.media_types,
            ..SelectionOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = SelectionOptions::default();
        assert_eq!(options.media_types, MediaTypeFilter::Images);
        assert!(!options.allows_editing);
        assert!(!options.allows_multiple_selection);
        assert!(!options.exif);
        assert!(!options.base64);
        assert!(options.quality.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_quality_bounds() {
        for quality in [0.0, 0.25, 0.5, 1.0] {
            let options = SelectionOptions {
                quality: Some(quality),
                ..SelectionOptions::default()
            };
            assert!(options.validate().is_ok(), "quality {quality} should pass");
        }

        for quality in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            let options = SelectionOptions {
                quality: Some(quality),
                ..SelectionOptions::default()
            };
            assert!(
                matches!(options.validate(), Err(PickerError::InvalidOption(_))),
                "quality {quality} should fail"
            );
        }
    }

    #[test]
    fn test_aspect_ignored_without_editing() {
        let options = SelectionOptions {
            aspect: Some((-4.0, 0.0)),
            ..SelectionOptions::default()
        };
        assert!(options.validate().is_ok());
        assert_eq!(options.effective_aspect(), None);
    }

    #[test]
    fn test_aspect_checked_when_editing() {
        let mut options = SelectionOptions {
            allows_editing: true,
            aspect: Some((4.0, 3.0)),
            ..SelectionOptions::default()
        };
        assert!(options.validate().is_ok());
        assert_eq!(options.effective_aspect(), Some((4.0, 3.0)));

        options.aspect = Some((4.0, 0.0));
        assert!(matches!(
            options.validate(),
            Err(PickerError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_deserialize_camel_case_record() {
        let options: SelectionOptions = serde_json::from_value(json!({
            "allowsEditing": true,
            "aspect": [16, 9],
            "quality": 0.8,
            "mediaTypes": "All",
            "base64": true
        }))
        .unwrap();
        assert!(options.allows_editing);
        assert_eq!(options.aspect, Some((16.0, 9.0)));
        assert_eq!(options.media_types, MediaTypeFilter::All);
        assert!(options.base64);
        assert!(!options.exif);
    }

    #[test]
    fn test_file_browser_options_drop_extras() {
        let browser = OpenFileBrowserOptions {
            media_types: MediaTypeFilter::Videos,
            capture: true,
            allows_multiple_selection: true,
        };

        let back = browser.to_selection();
        assert_eq!(back.media_types, MediaTypeFilter::Videos);
        assert!(back.allows_multiple_selection);
        assert!(!back.allows_editing);
        assert!(!back.exif);
        assert!(!back.base64);
        assert!(back.quality.is_none());
    }
}
