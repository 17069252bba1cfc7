use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct SemsResponse {
    pub code: i64,
    pub msg: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginResponse {
    pub data: LoginData,
}

#[derive(Deserialize, Debug)]
pub struct LoginData {
    pub token: String,
    pub timestamp: i64,
    pub uid: String,
}

#[derive(Deserialize, Debug)]
pub struct ChartResponse {
    pub data: ChartData,
}

#[derive(Deserialize, Debug)]
pub struct ChartData {
    pub lines: Vec<ChartLine>,
}

#[derive(Deserialize, Debug)]
pub struct ChartLine {
    pub label: String,
    pub xy: Vec<ChartPoint>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChartPoint {
    pub x: String,
    pub y: f64,
}
