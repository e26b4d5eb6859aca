/// 草稿邮件的 MIME 构建
///
/// 生成单段 text/plain 邮件并按 Gmail API 要求做 base64url 编码
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE},
};

/// base64 正文每行最大长度（RFC 2045）
const BASE64_LINE_LEN: usize = 76;

/// 构建 RFC 2822 纯文本邮件
pub fn build_plain_text(to: &str, subject: &str, body: &str) -> String {
    let (encoding, encoded_body) = if body.is_ascii() {
        ("7bit", body.to_string())
    } else {
        ("base64", wrap_base64(&STANDARD.encode(body)))
    };

    format!(
        "Content-Type: text/plain; charset=\"utf-8\"\r\n\
         MIME-Version: 1.0\r\n\
         Content-Transfer-Encoding: {}\r\n\
         To: {}\r\n\
         Subject: {}\r\n\
         \r\n\
         {}",
        encoding,
        single_line(to),
        encode_header(&single_line(subject)),
        encoded_body
    )
}

/// 构建并编码为 API 需要的 `raw` 字段
pub fn encode_raw(to: &str, subject: &str, body: &str) -> String {
    URL_SAFE.encode(build_plain_text(to, subject, body))
}

/// 头部值中不允许出现换行
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// 非 ASCII 头部使用 RFC 2047 encoded-word
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(value))
    }
}

fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(BASE64_LINE_LEN)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}
