//! Node type filter masks

use crate::NodeType;

/// What types of nodes to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhatToShow(u32);

impl WhatToShow {
    pub const ALL: WhatToShow = WhatToShow(0xFFFFFFFF);
    pub const ELEMENT: WhatToShow = WhatToShow(0x1);
    pub const TEXT: WhatToShow = WhatToShow(0x4);
    pub const CDATA_SECTION: WhatToShow = WhatToShow(0x8);
    pub const PROCESSING_INSTRUCTION: WhatToShow = WhatToShow(0x40);
    pub const COMMENT: WhatToShow = WhatToShow(0x80);
    pub const DOCUMENT: WhatToShow = WhatToShow(0x100);
    pub const DOCUMENT_TYPE: WhatToShow = WhatToShow(0x200);
    pub const DOCUMENT_FRAGMENT: WhatToShow = WhatToShow(0x400);

    /// Check if a node type is shown
    pub fn includes(self, node_type: NodeType) -> bool {
        let flag = match node_type {
            NodeType::Element => Self::ELEMENT.0,
            NodeType::Text => Self::TEXT.0,
            NodeType::CDataSection => Self::CDATA_SECTION.0,
            NodeType::ProcessingInstruction => Self::PROCESSING_INSTRUCTION.0,
            NodeType::Comment => Self::COMMENT.0,
            NodeType::Document => Self::DOCUMENT.0,
            NodeType::DocumentType => Self::DOCUMENT_TYPE.0,
            NodeType::DocumentFragment => Self::DOCUMENT_FRAGMENT.0,
        };
        (self.0 & flag) != 0
    }

    /// Union of two filters
    pub fn or(self, other: WhatToShow) -> WhatToShow {
        WhatToShow(self.0 | other.0)
    }
}

impl Default for WhatToShow {
    fn default() -> Self {
        Self::ALL
    }
}
