use serde::Serialize;

/// Question ids of the standard catalog.
pub mod ids {
    pub const BUSINESS_TYPE: &str = "business_type";
    pub const INDUSTRY: &str = "industry";
    pub const PURPOSE: &str = "purpose";
    pub const EMPLOYEES: &str = "employees";
    pub const LOCATION: &str = "location";
    pub const BUDGET: &str = "budget";
    pub const URGENCY: &str = "urgency";
}

pub const PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県", "茨城県", "栃木県",
    "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県", "新潟県", "富山県", "石川県", "福井県",
    "山梨県", "長野県", "岐阜県", "静岡県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府",
    "兵庫県", "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県", "徳島県",
    "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県", "熊本県", "大分県", "宮崎県",
    "鹿児島県", "沖縄県",
];

/// How many values a question accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerArity {
    Single,
    Multiple,
    /// Single choice drawn from the prefecture list.
    Prefecture,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub arity: AnswerArity,
    pub required: bool,
    pub weight: f64,
    pub options: Vec<QuestionOption>,
}

impl Question {
    pub fn new(
        id: &str,
        prompt: &str,
        arity: AnswerArity,
        required: bool,
        weight: f64,
        options: &[(&str, &str)],
    ) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            arity,
            required,
            weight,
            options: options
                .iter()
                .map(|(value, label)| QuestionOption {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    /// An empty option set accepts any value.
    pub fn accepts(&self, value: &str) -> bool {
        self.options.is_empty() || self.options.iter().any(|option| option.value == value)
    }
}

/// Ordered, immutable set of diagnosis questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn standard() -> Self {
        let prefectures: Vec<(&str, &str)> = PREFECTURES.iter().map(|name| (*name, *name)).collect();

        Self::new(vec![
            Question::new(
                ids::BUSINESS_TYPE,
                "事業形態を選択してください",
                AnswerArity::Single,
                true,
                1.5,
                &[
                    ("corporation", "法人（株式会社・有限会社等）"),
                    ("sole_proprietor", "個人事業主"),
                    ("npo", "NPO法人"),
                    ("association", "組合・団体"),
                    ("startup", "スタートアップ・創業予定"),
                ],
            ),
            Question::new(
                ids::INDUSTRY,
                "業種を選択してください",
                AnswerArity::Single,
                true,
                1.3,
                &[
                    ("it", "IT・デジタル"),
                    ("manufacturing", "ものづくり・製造業"),
                    ("retail", "小売・サービス業"),
                    ("agriculture", "農林水産業"),
                    ("medical", "医療・福祉"),
                    ("education", "教育・研究"),
                    ("construction", "建設・不動産"),
                    ("other", "その他"),
                ],
            ),
            Question::new(
                ids::PURPOSE,
                "助成金の使用目的は？（複数選択可）",
                AnswerArity::Multiple,
                true,
                1.2,
                &[
                    ("equipment", "設備投資・機械購入"),
                    ("hr", "人材採用・育成"),
                    ("rd", "研究開発・技術開発"),
                    ("marketing", "販路拡大・マーケティング"),
                    ("digitalization", "デジタル化・IT導入"),
                    ("eco", "環境対策・省エネ"),
                    ("startup_fund", "創業・起業資金"),
                    ("working_capital", "運転資金"),
                ],
            ),
            Question::new(
                ids::EMPLOYEES,
                "従業員数は？",
                AnswerArity::Single,
                true,
                1.0,
                &[
                    ("0", "0人（本人のみ）"),
                    ("1-5", "1～5人"),
                    ("6-20", "6～20人"),
                    ("21-50", "21～50人"),
                    ("51-100", "51～100人"),
                    ("101-300", "101～300人"),
                    ("301+", "301人以上"),
                ],
            ),
            Question::new(
                ids::LOCATION,
                "事業所の所在地は？",
                AnswerArity::Prefecture,
                true,
                1.1,
                &prefectures,
            ),
            Question::new(
                ids::BUDGET,
                "希望する助成金額は？",
                AnswerArity::Single,
                false,
                0.8,
                &[
                    ("0-100", "～100万円"),
                    ("100-500", "100～500万円"),
                    ("500-1000", "500～1000万円"),
                    ("1000-3000", "1000～3000万円"),
                    ("3000+", "3000万円以上"),
                ],
            ),
            Question::new(
                ids::URGENCY,
                "申請時期の希望は？",
                AnswerArity::Single,
                false,
                0.6,
                &[
                    ("immediate", "すぐに申請したい"),
                    ("1-3months", "1～3ヶ月以内"),
                    ("3-6months", "3～6ヶ月以内"),
                    ("6months+", "6ヶ月以上先でも可"),
                ],
            ),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Default for QuestionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
