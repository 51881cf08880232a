//! 受害人说明记录（Zapis wyjaśnień poszkodowanego）
//!
//! 类型化视图。运行时编辑在 `Node` 树上进行，
//! 需要校验或裁剪时再转换为本结构。

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppResult;
use crate::state::{Node, Path, SectionId};

/// 可选子对象：`false` 表示不适用
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Toggle<T> {
    #[default]
    Disabled,
    Enabled(T),
}

impl<T> Toggle<T> {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Toggle::Enabled(_))
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Toggle::Enabled(v) => Some(v),
            Toggle::Disabled => None,
        }
    }
}

impl<T: Serialize> Serialize for Toggle<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Toggle::Disabled => serializer.serialize_bool(false),
            Toggle::Enabled(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Toggle<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Flag(bool),
            Null(()),
            Value(T),
        }

        match Repr::<T>::deserialize(deserializer)? {
            Repr::Flag(false) | Repr::Null(()) => Ok(Toggle::Disabled),
            Repr::Flag(true) => Err(D::Error::custom("期望 false 或对象，得到 true")),
            Repr::Value(v) => Ok(Toggle::Enabled(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    pub pesel: String,
    pub id_type: String,
    pub id_number: String,
    pub birth_date: String,
    pub birth_place: String,
    pub phone_number: String,
    pub address: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccidentDetails {
    pub date: String,
    pub time: String,
    pub location: String,
    pub planned_work_start: String,
    pub planned_work_end: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
    pub production_date: String,
}

/// 直接致害的机器/工具
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CausedByMachine {
    pub machine_info: MachineInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_functional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_according_to_manual: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_of_use: Option<String>,
}

/// 参与作业但非直接致害的其他机器/工具
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineryToolsInfo {
    pub involved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_or_tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_functional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_according_to_manual: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_of_use: Option<String>,
}

/// 防护装备：`false` 或装备列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProtectiveEquipment {
    Flag(bool),
    Items(Vec<String>),
}

impl Default for ProtectiveEquipment {
    fn default() -> Self {
        ProtectiveEquipment::Flag(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsedSafetySupport {
    pub required_more_than_one_person: bool,
}

/// 安全保障措施：`false` 或详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SafetySupport {
    Flag(bool),
    Details(UsedSafetySupport),
}

impl Default for SafetySupport {
    fn default() -> Self {
        SafetySupport::Flag(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BhpTraining {
    pub completed_training: bool,
    pub has_risk_assessment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reduction_measures: Option<String>,
}

impl Default for BhpTraining {
    fn default() -> Self {
        Self {
            completed_training: true,
            has_risk_assessment: true,
            risk_reduction_measures: Some(String::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestedBy {
    Police,
    MedicalHelp,
    #[serde(alias = "none")]
    NotTested,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Intoxication {
    pub intoxicated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tested_by: Option<TestedBy>,
}

impl Default for Intoxication {
    fn default() -> Self {
        Self {
            intoxicated: false,
            tested_by: Some(TestedBy::NotTested),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityStatus {
    Finished,
    Pending,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateAuthorityAction {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AuthorityStatus>,
}

impl StateAuthorityAction {
    /// 界面"新增"按钮产生的空条目
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            address: Some(String::new()),
            case_number: None,
            status: Some(AuthorityStatus::Pending),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HospitalizationPeriod {
    pub from: String,
    pub to: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncapacityPeriod {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicalHelpDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_first_aid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcare_facility_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospitalization_period: Option<HospitalizationPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosed_injury: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incapacity_period: Option<IncapacityPeriod>,
    pub sick_leave_on_accident_day: bool,
}

/// 受害人说明记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccidentExplanationRecord {
    pub personal_data: Person,
    pub accident_details: AccidentDetails,
    pub work_activity_before_accident: String,
    pub accident_circumstances: String,
    pub accident_cause: String,
    pub caused_by_machine_or_tool: Toggle<CausedByMachine>,
    pub machinery_tools_info: MachineryToolsInfo,
    pub used_protective_equipment: ProtectiveEquipment,
    pub used_safety_support: SafetySupport,
    pub bhp_compliance: bool,
    pub has_proper_preparation: bool,
    pub bhp_training: BhpTraining,
    pub intoxication: Intoxication,
    pub state_authority_actions: Toggle<Vec<StateAuthorityAction>>,
    pub medical_help: Toggle<MedicalHelpDetails>,
}

impl Default for AccidentExplanationRecord {
    fn default() -> Self {
        Self {
            personal_data: Person::default(),
            accident_details: AccidentDetails::default(),
            work_activity_before_accident: String::new(),
            accident_circumstances: String::new(),
            accident_cause: String::new(),
            caused_by_machine_or_tool: Toggle::Disabled,
            machinery_tools_info: MachineryToolsInfo::default(),
            used_protective_equipment: ProtectiveEquipment::default(),
            used_safety_support: SafetySupport::default(),
            bhp_compliance: true,
            has_proper_preparation: true,
            bhp_training: BhpTraining::default(),
            intoxication: Intoxication::default(),
            state_authority_actions: Toggle::Disabled,
            medical_help: Toggle::Disabled,
        }
    }
}

impl AccidentExplanationRecord {
    pub fn to_node(&self) -> AppResult<Node> {
        Ok(Node::from(serde_json::to_value(self)?))
    }

    pub fn from_node(node: &Node) -> AppResult<Self> {
        Ok(serde_json::from_value(node.to_json())?)
    }

    /// 清除已关闭子分区中残留的数据
    ///
    /// 取消勾选只翻转标志位，子对象原样保留；提交前按需调用。
    pub fn prune_disabled(&mut self) {
        if !self.machinery_tools_info.involved {
            self.machinery_tools_info = MachineryToolsInfo::default();
        }
        if !self.intoxication.intoxicated {
            self.intoxication.tested_by = Some(TestedBy::NotTested);
        }
        if let ProtectiveEquipment::Flag(_) = self.used_protective_equipment {
            self.used_protective_equipment = ProtectiveEquipment::Flag(false);
        }
    }

    /// 缺失的必填字段（只用于提示，不阻止提交）
    pub fn missing_required(&self) -> Vec<RecordField> {
        let checks = [
            (RecordField::Pesel, &self.personal_data.pesel),
            (RecordField::IdNumber, &self.personal_data.id_number),
            (RecordField::AccidentDate, &self.accident_details.date),
            (RecordField::AccidentTime, &self.accident_details.time),
            (RecordField::AccidentLocation, &self.accident_details.location),
        ];
        checks
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
            .collect()
    }

    /// 邮箱为空视为有效
    pub fn has_valid_email(&self) -> bool {
        let email = self.personal_data.email.trim();
        email.is_empty() || is_valid_email(email)
    }
}

/// 邮箱格式检查
pub fn is_valid_email(email: &str) -> bool {
    Regex::new(r"\S+@\S+\.\S+")
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

/// 受害人记录中的已知叶子字段
///
/// 用枚举代替手写路径数组，避免拼写错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Pesel,
    IdType,
    IdNumber,
    BirthDate,
    BirthPlace,
    PhoneNumber,
    Address,
    Email,
    AccidentDate,
    AccidentTime,
    AccidentLocation,
    PlannedWorkStart,
    PlannedWorkEnd,
    WorkActivityBeforeAccident,
    AccidentCircumstances,
    AccidentCause,
    OtherMachineryInvolved,
    BhpCompliance,
    HasProperPreparation,
    CompletedTraining,
    HasRiskAssessment,
    RiskReductionMeasures,
    Intoxicated,
    TestedBy,
    DateOfFirstAid,
    HealthcareFacilityName,
    DiagnosedInjury,
    SickLeaveOnAccidentDay,
}

impl RecordField {
    pub const ALL: [RecordField; 28] = [
        RecordField::Pesel,
        RecordField::IdType,
        RecordField::IdNumber,
        RecordField::BirthDate,
        RecordField::BirthPlace,
        RecordField::PhoneNumber,
        RecordField::Address,
        RecordField::Email,
        RecordField::AccidentDate,
        RecordField::AccidentTime,
        RecordField::AccidentLocation,
        RecordField::PlannedWorkStart,
        RecordField::PlannedWorkEnd,
        RecordField::WorkActivityBeforeAccident,
        RecordField::AccidentCircumstances,
        RecordField::AccidentCause,
        RecordField::OtherMachineryInvolved,
        RecordField::BhpCompliance,
        RecordField::HasProperPreparation,
        RecordField::CompletedTraining,
        RecordField::HasRiskAssessment,
        RecordField::RiskReductionMeasures,
        RecordField::Intoxicated,
        RecordField::TestedBy,
        RecordField::DateOfFirstAid,
        RecordField::HealthcareFacilityName,
        RecordField::DiagnosedInjury,
        RecordField::SickLeaveOnAccidentDay,
    ];

    fn keys(&self) -> &'static [&'static str] {
        match self {
            RecordField::Pesel => &["personalData", "pesel"],
            RecordField::IdType => &["personalData", "idType"],
            RecordField::IdNumber => &["personalData", "idNumber"],
            RecordField::BirthDate => &["personalData", "birthDate"],
            RecordField::BirthPlace => &["personalData", "birthPlace"],
            RecordField::PhoneNumber => &["personalData", "phoneNumber"],
            RecordField::Address => &["personalData", "address"],
            RecordField::Email => &["personalData", "email"],
            RecordField::AccidentDate => &["accidentDetails", "date"],
            RecordField::AccidentTime => &["accidentDetails", "time"],
            RecordField::AccidentLocation => &["accidentDetails", "location"],
            RecordField::PlannedWorkStart => &["accidentDetails", "plannedWorkStart"],
            RecordField::PlannedWorkEnd => &["accidentDetails", "plannedWorkEnd"],
            RecordField::WorkActivityBeforeAccident => &["workActivityBeforeAccident"],
            RecordField::AccidentCircumstances => &["accidentCircumstances"],
            RecordField::AccidentCause => &["accidentCause"],
            RecordField::OtherMachineryInvolved => &["machineryToolsInfo", "involved"],
            RecordField::BhpCompliance => &["bhpCompliance"],
            RecordField::HasProperPreparation => &["hasProperPreparation"],
            RecordField::CompletedTraining => &["bhpTraining", "completedTraining"],
            RecordField::HasRiskAssessment => &["bhpTraining", "hasRiskAssessment"],
            RecordField::RiskReductionMeasures => &["bhpTraining", "riskReductionMeasures"],
            RecordField::Intoxicated => &["intoxication", "intoxicated"],
            RecordField::TestedBy => &["intoxication", "testedBy"],
            RecordField::DateOfFirstAid => &["medicalHelp", "dateOfFirstAid"],
            RecordField::HealthcareFacilityName => &["medicalHelp", "healthcareFacilityName"],
            RecordField::DiagnosedInjury => &["medicalHelp", "diagnosedInjury"],
            RecordField::SickLeaveOnAccidentDay => &["medicalHelp", "sickLeaveOnAccidentDay"],
        }
    }

    /// 字段在记录树中的路径
    pub fn path(&self) -> Path {
        Path::from(self.keys())
    }

    /// 字段所在分区
    pub fn section(&self) -> SectionId {
        match self {
            RecordField::Pesel
            | RecordField::IdType
            | RecordField::IdNumber
            | RecordField::BirthDate
            | RecordField::BirthPlace
            | RecordField::PhoneNumber
            | RecordField::Address
            | RecordField::Email => SectionId::PersonalData,
            RecordField::AccidentDate
            | RecordField::AccidentTime
            | RecordField::AccidentLocation
            | RecordField::PlannedWorkStart
            | RecordField::PlannedWorkEnd
            | RecordField::WorkActivityBeforeAccident
            | RecordField::AccidentCircumstances
            | RecordField::AccidentCause => SectionId::AccidentDetails,
            RecordField::OtherMachineryInvolved => SectionId::OtherMachinery,
            RecordField::BhpCompliance
            | RecordField::HasProperPreparation
            | RecordField::CompletedTraining
            | RecordField::HasRiskAssessment
            | RecordField::RiskReductionMeasures => SectionId::SafetyCompliance,
            RecordField::Intoxicated | RecordField::TestedBy => SectionId::Intoxication,
            RecordField::DateOfFirstAid
            | RecordField::HealthcareFacilityName
            | RecordField::DiagnosedInjury
            | RecordField::SickLeaveOnAccidentDay => SectionId::MedicalHelp,
        }
    }

    /// 按路径反查字段
    pub fn from_path(path: &Path) -> Option<RecordField> {
        RecordField::ALL.into_iter().find(|f| &f.path() == path)
    }
}
