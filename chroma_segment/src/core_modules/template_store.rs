// THEORY:
// The `TemplateStore` holds the labeled calibration samples: one ordered collection of
// finalized distributions per class. It is plain owned state, handed by reference to the
// classifier; nothing in the engine reaches for it globally. Templates are appended
// during calibration and only read during classification. Insertion order carries no
// meaning beyond iteration.

use crate::core_modules::color_distribution::{ColorDistribution, HIST_SIZE};
use std::fmt;

/// A finalized distribution representing one labeled calibration sample.
pub type Template = ColorDistribution<HIST_SIZE>;

/// The two classes a block can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateClass {
    Background,
    Object,
}

impl fmt::Display for TemplateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateClass::Background => f.write_str("background"),
            TemplateClass::Object => f.write_str("object"),
        }
    }
}

/// Calibration templates for both classes.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    background: Vec<Template>,
    object: Vec<Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a template to the collection of `class`.
    ///
    /// Only finalized distributions are meaningful here; an open one would make every
    /// distance against it come back not-ready, so it is dropped with a warning.
    pub fn add(&mut self, class: TemplateClass, template: Template) {
        if !template.is_finalized() {
            log::warn!("ignoring non-finalized {} template", class);
            return;
        }
        self.collection_mut(class).push(template);
    }

    pub fn templates(&self, class: TemplateClass) -> &[Template] {
        match class {
            TemplateClass::Background => &self.background,
            TemplateClass::Object => &self.object,
        }
    }

    pub fn len(&self, class: TemplateClass) -> usize {
        self.templates(class).len()
    }

    pub fn is_empty(&self) -> bool {
        self.background.is_empty() && self.object.is_empty()
    }

    /// True once both classes hold at least one template.
    pub fn is_ready(&self) -> bool {
        !self.background.is_empty() && !self.object.is_empty()
    }

    pub fn clear(&mut self) {
        self.background.clear();
        self.object.clear();
    }

    fn collection_mut(&mut self, class: TemplateClass) -> &mut Vec<Template> {
        match class {
            TemplateClass::Background => &mut self.background,
            TemplateClass::Object => &mut self.object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn template(color: [u8; 3]) -> Template {
        let mut template = Template::new();
        template.add(Rgb(color));
        template.finalize().unwrap();
        template
    }

    #[test]
    fn templates_are_kept_per_class_in_insertion_order() {
        let mut store = TemplateStore::new();
        assert!(store.is_empty());

        store.add(TemplateClass::Background, template([0, 0, 0]));
        store.add(TemplateClass::Background, template([50, 50, 50]));
        store.add(TemplateClass::Object, template([255, 0, 0]));

        assert_eq!(store.len(TemplateClass::Background), 2);
        assert_eq!(store.len(TemplateClass::Object), 1);
        assert_eq!(store.templates(TemplateClass::Background)[1], template([50, 50, 50]));
        assert!(store.is_ready());
    }

    #[test]
    fn open_distributions_are_not_stored() {
        let mut store = TemplateStore::new();
        let mut open = Template::new();
        open.add(Rgb([1, 1, 1]));
        store.add(TemplateClass::Object, open);
        assert_eq!(store.len(TemplateClass::Object), 0);
    }

    #[test]
    fn clear_empties_both_classes() {
        let mut store = TemplateStore::new();
        store.add(TemplateClass::Background, template([0, 0, 0]));
        store.add(TemplateClass::Object, template([255, 0, 0]));
        store.clear();
        assert!(store.is_empty());
        assert!(!store.is_ready());
    }
}
