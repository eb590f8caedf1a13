// THEORY:
// The `NearestTemplateMatcher` answers one question: how close is this histogram to the
// closest known example of a class? Only the minimum distance is consumed downstream,
// so which template achieved it (and how ties break) does not matter. An empty
// collection is reported as `NoTemplates` rather than a magic large number, so a missing
// calibration never silently biases every block toward one class.

use crate::core_modules::template_store::{Template, TemplateClass};
use crate::error::{Result, SegmentError};

/// Minimum distance from `histogram` to any template of `class`.
pub fn nearest(histogram: &Template, templates: &[Template], class: TemplateClass) -> Result<f32> {
    let mut best: Option<f32> = None;
    for template in templates {
        let distance = histogram.try_distance(template)?;
        best = Some(best.map_or(distance, |current| current.min(distance)));
    }
    best.ok_or(SegmentError::NoTemplates(class))
}
