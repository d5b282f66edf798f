use eqdraw_core::document::{CENTER, CONTINUOUS, DASHED, Document};

use crate::spec::ConnectionKind;

/// 图纸使用的固定图层。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardLayer {
    Components,
    Hidden,
    Centerlines,
    Hatching,
    Tags,
    Captions,
    Piping,
    Electrical,
    Signal,
    Structural,
    ConnectionLabels,
    Callouts,
    Annotations,
    Border,
    Title,
    Grid,
}

impl StandardLayer {
    pub const ALL: [StandardLayer; 16] = [
        StandardLayer::Components,
        StandardLayer::Hidden,
        StandardLayer::Centerlines,
        StandardLayer::Hatching,
        StandardLayer::Tags,
        StandardLayer::Captions,
        StandardLayer::Piping,
        StandardLayer::Electrical,
        StandardLayer::Signal,
        StandardLayer::Structural,
        StandardLayer::ConnectionLabels,
        StandardLayer::Callouts,
        StandardLayer::Annotations,
        StandardLayer::Border,
        StandardLayer::Title,
        StandardLayer::Grid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StandardLayer::Components => "COMPONENTS",
            StandardLayer::Hidden => "HIDDEN",
            StandardLayer::Centerlines => "CENTERLINES",
            StandardLayer::Hatching => "HATCHING",
            StandardLayer::Tags => "EQUIPMENT_TAGS",
            StandardLayer::Captions => "CAPTIONS",
            StandardLayer::Piping => "PIPING",
            StandardLayer::Electrical => "ELECTRICAL",
            StandardLayer::Signal => "SIGNAL",
            StandardLayer::Structural => "STRUCTURAL",
            StandardLayer::ConnectionLabels => "CONNECTION_LABELS",
            StandardLayer::Callouts => "CALLOUTS",
            StandardLayer::Annotations => "ANNOTATIONS",
            StandardLayer::Border => "BORDER",
            StandardLayer::Title => "TITLE",
            StandardLayer::Grid => "GRID",
        }
    }

    /// ACI 颜色号。
    pub fn color(self) -> i16 {
        match self {
            StandardLayer::Components | StandardLayer::Border | StandardLayer::Title => 7,
            StandardLayer::Hidden | StandardLayer::Hatching => 8,
            StandardLayer::Centerlines => 1,
            StandardLayer::Tags | StandardLayer::Callouts => 2,
            StandardLayer::Captions | StandardLayer::Annotations => 3,
            StandardLayer::ConnectionLabels => 4,
            StandardLayer::Piping => 5,
            StandardLayer::Signal => 6,
            StandardLayer::Electrical => 30,
            StandardLayer::Structural | StandardLayer::Grid => 9,
        }
    }

    pub fn linetype(self) -> &'static str {
        match self {
            StandardLayer::Hidden | StandardLayer::Signal => DASHED,
            StandardLayer::Centerlines | StandardLayer::Structural => CENTER,
            _ => CONTINUOUS,
        }
    }

    /// 连接线所在图层。
    pub fn for_connection(kind: ConnectionKind) -> Self {
        match kind {
            ConnectionKind::Pipe => StandardLayer::Piping,
            ConnectionKind::Electrical => StandardLayer::Electrical,
            ConnectionKind::Signal => StandardLayer::Signal,
            ConnectionKind::Structural => StandardLayer::Structural,
        }
    }
}

/// 在文档中声明全部固定图层。
pub fn declare_standard_layers(document: &mut Document) {
    for layer in StandardLayer::ALL {
        document.declare_layer(layer.name(), layer.color(), layer.linetype());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_kinds_map_to_distinct_layers() {
        let kinds = [
            ConnectionKind::Pipe,
            ConnectionKind::Electrical,
            ConnectionKind::Signal,
            ConnectionKind::Structural,
        ];
        let mut names: Vec<_> = kinds
            .iter()
            .map(|kind| StandardLayer::for_connection(*kind).name())
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), kinds.len());
        assert_eq!(StandardLayer::Signal.linetype(), DASHED);
        assert_eq!(StandardLayer::Structural.linetype(), CENTER);
    }

    #[test]
    fn declared_layers_reference_declared_linetypes() {
        let mut document = Document::new();
        declare_standard_layers(&mut document);
        for layer in StandardLayer::ALL {
            let declared = document.layer(layer.name()).expect("layer declared");
            assert!(document.linetype(&declared.linetype).is_some());
        }
    }
}
