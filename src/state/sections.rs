//! 分区展开状态
//!
//! 每个分区的展开/折叠状态互相独立。两种输入：
//! - 用户点击（`toggle` / `set`）
//! - 聊天数据到达（`force_open`）

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 分区标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    // 受害人说明表单
    PersonalData,
    AccidentDetails,
    MachineCause,
    OtherMachinery,
    SafetyCompliance,
    Intoxication,
    StateAuthority,
    MedicalHelp,
    // 事故报告表单
    General,
    WorkCircumstances,
    Machinery,
    Investigation,
    Medical,
}

impl SectionId {
    /// 分区标题（与界面一致）
    pub fn title(&self) -> &'static str {
        match self {
            SectionId::PersonalData => "1. Dane osobowe",
            SectionId::AccidentDetails => "2. Szczegóły wypadku",
            SectionId::MachineCause => "3. Wypadek spowodowany przez maszynę/narzędzie",
            SectionId::OtherMachinery => "4. Inne maszyny/narzędzia",
            SectionId::SafetyCompliance => "5. Bezpieczeństwo i zgodność z BHP",
            SectionId::Intoxication => "6. Stan trzeźwości",
            SectionId::StateAuthority => "7. Działania organów państwowych",
            SectionId::MedicalHelp => "8. Pomoc medyczna i skutki",
            SectionId::General => "Opis ogólny",
            SectionId::WorkCircumstances => "Okoliczności pracy",
            SectionId::Machinery => "Maszyny",
            SectionId::Investigation => "Postępowanie wyjaśniające",
            SectionId::Medical => "Pomoc medyczna",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// 分区可见性映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionVisibility {
    open: BTreeMap<SectionId, bool>,
}

impl SectionVisibility {
    /// 按给定分区列表创建，只有 `default_open` 展开
    pub fn new(sections: &[SectionId], default_open: SectionId) -> Self {
        let open = sections
            .iter()
            .map(|id| (*id, *id == default_open))
            .collect();
        Self { open }
    }

    /// 用户点击：翻转该分区，返回新状态
    pub fn toggle(&mut self, id: SectionId) -> bool {
        let entry = self.open.entry(id).or_insert(false);
        *entry = !*entry;
        *entry
    }

    pub fn set(&mut self, id: SectionId, open: bool) {
        self.open.insert(id, open);
    }

    /// 数据到达：强制展开。返回是否由折叠变为展开
    pub fn force_open(&mut self, id: SectionId) -> bool {
        let was_open = self.is_open(id);
        self.open.insert(id, true);
        !was_open
    }

    pub fn is_open(&self, id: SectionId) -> bool {
        self.open.get(&id).copied().unwrap_or(false)
    }

    /// 当前展开的分区
    pub fn open_sections(&self) -> Vec<SectionId> {
        self.open
            .iter()
            .filter(|(_, open)| **open)
            .map(|(id, _)| *id)
            .collect()
    }

    /// 全部分区及状态
    pub fn iter(&self) -> impl Iterator<Item = (SectionId, bool)> + '_ {
        self.open.iter().map(|(id, open)| (*id, *open))
    }
}
