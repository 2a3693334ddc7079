//! Ordered traversal of a top-level configuration section.
//!
//! ```text
//! <title>:
//!   <child>:          # e.g. knative/serving
//!   - <entries...>    # one generate() call per list element
//!   - <entries...>
//!                     # one finalize() call per child, after its elements
//! ```

use crate::error::{ConfigError, Location};
use crate::node::ConfigMap;

/// Callbacks driven by [`parse_section`].
pub trait SectionVisitor {
    type Error: From<ConfigError>;

    /// Called once per list element of a child, in document order.
    fn generate(
        &mut self,
        title: &str,
        child: &str,
        entries: &ConfigMap,
        location: &Location,
    ) -> Result<(), Self::Error>;

    /// Called once per child after all of its elements were generated.
    fn finalize(
        &mut self,
        _title: &str,
        _child: &str,
        _accumulated: &[&ConfigMap],
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Walk every top-level entry named `title`. An absent section is a no-op.
pub fn parse_section<V: SectionVisitor>(
    config: &ConfigMap,
    title: &str,
    visitor: &mut V,
) -> Result<(), V::Error> {
    for (key, section) in config.iter() {
        if key != title || section.is_absent() {
            continue;
        }
        let section_loc = Location::root(title);
        for (child, elements) in section.expect_map(&section_loc)?.iter() {
            let child_loc = section_loc.child(child);
            let mut accumulated = Vec::new();
            if !elements.is_absent() {
                for (i, element) in elements.expect_sequence(&child_loc)?.iter().enumerate() {
                    let element_loc = child_loc.index(i);
                    let entries = element.expect_map(&element_loc)?;
                    visitor.generate(title, child, entries, &element_loc)?;
                    accumulated.push(entries);
                }
            }
            visitor.finalize(title, child, &accumulated)?;
        }
    }
    Ok(())
}
