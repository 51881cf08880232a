//! 事故报告（Zapis zawiadomienia o wypadku）
//!
//! 扁平记录，字段名与聊天接口的 `collected_data` 对齐。

use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::state::{Node, SectionId};

/// 作业方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkArrangement {
    #[default]
    Solo,
    Team,
    #[serde(rename = "Supervised Group")]
    SupervisedGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccidentReportData {
    pub accident_date: String,
    pub accident_time: String,
    pub location: String,
    pub work_start_time: String,
    pub work_end_time: String,
    pub activity_before_accident: String,
    pub circumstances: String,
    pub cause: String,
    pub place_description: String,

    pub machines_involved: bool,
    pub machine_name_type: String,
    pub machine_production_date: String,
    pub machine_condition: String,
    pub proper_use: String,
    pub machine_description: String,

    pub safety_equipment_used: bool,
    pub safety_equipment_types: String,
    pub safety_equipment_condition: String,
    pub bhp_compliance: bool,
    pub professional_preparation: bool,
    pub bhp_training: bool,
    pub risk_assessment: bool,
    pub risk_mitigation: String,
    pub safety_measures: bool,
    pub work_solo_or_team: WorkArrangement,

    pub sobriety_state: bool,
    pub sobriety_tested: bool,
    pub sobriety_tested_by: String,
    pub investigation_authorities: bool,
    pub authority_name: String,
    pub authority_address: String,
    pub authority_case_number: String,
    pub authority_case_status: String,

    pub first_aid_provided: bool,
    pub first_aid_date: String,
    pub medical_facility: String,
    pub hospitalization_period: String,
    pub hospitalization_place: String,
    pub diagnosed_injury: String,
    pub work_incapacity_period: String,
    pub sick_leave_on_accident_day: bool,

    pub witnesses: String,
    pub event_sequence: String,
}

impl Default for AccidentReportData {
    fn default() -> Self {
        Self {
            accident_date: String::new(),
            accident_time: String::new(),
            location: String::new(),
            work_start_time: String::new(),
            work_end_time: String::new(),
            activity_before_accident: String::new(),
            circumstances: String::new(),
            cause: String::new(),
            place_description: String::new(),
            machines_involved: false,
            machine_name_type: String::new(),
            machine_production_date: String::new(),
            machine_condition: String::new(),
            proper_use: String::new(),
            machine_description: String::new(),
            safety_equipment_used: false,
            safety_equipment_types: String::new(),
            safety_equipment_condition: String::new(),
            bhp_compliance: false,
            professional_preparation: false,
            bhp_training: false,
            risk_assessment: false,
            risk_mitigation: String::new(),
            safety_measures: false,
            work_solo_or_team: WorkArrangement::Solo,
            sobriety_state: true,
            sobriety_tested: false,
            sobriety_tested_by: String::new(),
            investigation_authorities: false,
            authority_name: String::new(),
            authority_address: String::new(),
            authority_case_number: String::new(),
            authority_case_status: String::new(),
            first_aid_provided: false,
            first_aid_date: String::new(),
            medical_facility: String::new(),
            hospitalization_period: String::new(),
            hospitalization_place: String::new(),
            diagnosed_injury: String::new(),
            work_incapacity_period: String::new(),
            sick_leave_on_accident_day: false,
            witnesses: String::new(),
            event_sequence: String::new(),
        }
    }
}

impl AccidentReportData {
    pub fn to_node(&self) -> AppResult<Node> {
        Ok(Node::from(serde_json::to_value(self)?))
    }

    pub fn from_node(node: &Node) -> AppResult<Self> {
        Ok(serde_json::from_value(node.to_json())?)
    }

    /// 清空已关闭开关下的明细字段
    pub fn prune_disabled(&mut self) {
        if !self.machines_involved {
            self.machine_name_type.clear();
            self.machine_production_date.clear();
            self.machine_condition.clear();
            self.proper_use.clear();
            self.machine_description.clear();
        }
        if !self.safety_equipment_used {
            self.safety_equipment_types.clear();
            self.safety_equipment_condition.clear();
        }
        if !self.sobriety_tested {
            self.sobriety_tested_by.clear();
        }
        if !self.investigation_authorities {
            self.authority_name.clear();
            self.authority_address.clear();
            self.authority_case_number.clear();
            self.authority_case_status.clear();
        }
        if !self.first_aid_provided {
            self.first_aid_date.clear();
            self.medical_facility.clear();
        }
    }

    /// 缺失的必填字段名
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.accident_date.trim().is_empty() {
            missing.push("accident_date");
        }
        if self.accident_time.trim().is_empty() {
            missing.push("accident_time");
        }
        if self.location.trim().is_empty() {
            missing.push("location");
        }
        missing
    }
}

/// 报告字段所属分区
///
/// 未知字段名返回 `None`。
pub fn report_field_section(field: &str) -> Option<SectionId> {
    let section = match field {
        "accident_date" | "accident_time" | "location" | "place_description" => SectionId::General,
        "work_start_time" | "work_end_time" | "work_solo_or_team" | "activity_before_accident"
        | "circumstances" | "cause" | "event_sequence" | "witnesses" => {
            SectionId::WorkCircumstances
        }
        "machines_involved" | "machine_name_type" | "machine_production_date"
        | "machine_condition" | "proper_use" | "machine_description" => SectionId::Machinery,
        "safety_equipment_used" | "safety_equipment_types" | "safety_equipment_condition"
        | "bhp_compliance" | "professional_preparation" | "bhp_training" | "risk_assessment"
        | "risk_mitigation" | "safety_measures" => SectionId::SafetyCompliance,
        "sobriety_state" | "sobriety_tested" | "sobriety_tested_by"
        | "investigation_authorities" | "authority_name" | "authority_address"
        | "authority_case_number" | "authority_case_status" => SectionId::Investigation,
        "first_aid_provided" | "first_aid_date" | "medical_facility"
        | "hospitalization_period" | "hospitalization_place" | "diagnosed_injury"
        | "work_incapacity_period" | "sick_leave_on_accident_day" => SectionId::Medical,
        _ => return None,
    };
    Some(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_form() {
        let value = serde_json::to_value(AccidentReportData::default()).unwrap();
        assert_eq!(value["work_solo_or_team"], json!("Solo"));
        assert_eq!(value["sobriety_state"], json!(true));
        assert_eq!(value["machines_involved"], json!(false));
        assert_eq!(value["witnesses"], json!(""));
    }

    #[test]
    fn test_supervised_group_wire_name() {
        let node = Node::from(json!({"work_solo_or_team": "Supervised Group"}));
        let report = AccidentReportData::from_node(&node).unwrap();
        assert_eq!(report.work_solo_or_team, WorkArrangement::SupervisedGroup);
        assert!(report.sobriety_state);
    }

    #[test]
    fn test_prune_clears_machine_details_when_not_involved() {
        let mut report = AccidentReportData {
            machine_name_type: "Prasa hydrauliczna".into(),
            ..Default::default()
        };
        report.prune_disabled();
        assert!(report.machine_name_type.is_empty());

        let mut kept = AccidentReportData {
            machines_involved: true,
            machine_name_type: "Prasa hydrauliczna".into(),
            ..Default::default()
        };
        kept.prune_disabled();
        assert_eq!(kept.machine_name_type, "Prasa hydrauliczna");
    }

    #[test]
    fn test_every_default_field_has_a_section() {
        let value = serde_json::to_value(AccidentReportData::default()).unwrap();
        for key in value.as_object().unwrap().keys() {
            assert!(report_field_section(key).is_some(), "字段 {} 没有分区", key);
        }
    }
}
