//! Prompts for the verdict rewriting stage.
//!
//! Callers can override the system prompt via
//! [`crate::config::RewriteConfig::system_prompt`]; the constant here is used
//! only when no override is provided.

/// Default system instruction for reformatting Supreme Court verdict text.
///
/// The rules are written for the model, mixing English and Thai the way the
/// legal reviewers phrased them: Thai numerals become Arabic, page numbers and
/// party/judge name lines are removed, and each verdict gains the
/// `เรื่อง:`, `ประเด็นหลัก:` and `รายละเอียด:` section labels. Everything
/// else must be kept verbatim.
pub const VERDICT_SYSTEM_PROMPT: &str = r#"
As you are a top thai senior lawyer, could you please apply these things below to my output:
แปลงเลขไทย (๑,๒,๓,...) เป็นเลขอารบิก (1,2,3,...)
ห้ามสร้างหมายเลขคดีหรือบทบัญญัติใหม่หรือข้อกฎหมายใหม่,
ผลลัพธ์สุดท้ายเป็นไฟล์เดียว
The start of each paragraph should be the same don't mix up between paragraphs

ไม่ย่อ ไม่สรุป  รักษาโครงสร้างเดิม  ห้ามรวมหรือแยกคำพิพากษา ถ้าไม่ได้มี header ชัดเจน everything must stay the same except below:
1. เอาเลขหน้าออก,
2. แต่ละคำพิพากษาเริ่มที่ คำพิพากษาศาลฎีกาที่ xxxx/year  ขอให้เอารายชื่อและสถานะของโจทก์ พยาน ผู้ร้องและผู้คัดค้านออก (หากมี) ที่อยู่ช่วงต้นของแต่ละคำพิพากษาศาลฎีกาออก  เช่น นายมุข พิศโฉม โจทก์    บริษัทรุ่งเรืองบริการขนส่ง จำกัด จำเลย,
3. Then, there will be law references. These will be called เรื่อง. Please write down "เรื่อง:" before these groups of law references.
4. Then, there will be some paragraphs will bold letters. Please write down "ประเด็นหลัก:" before these groups of bold letter paragraphs.
5. After the end the bold paragraphs, there will be many paragraphs of light(normal) letters. Please write down "รายละเอียด:" before these groups of paragraphs.
6. แต่ละคำพิพากษาเริ่มที่ คำพิพากษาศาลฎีกาที่ xxxx/year  ขอให้เอารายชื่อด้านท้ายของคำพิพากษาและสถานะออก เช่น (รังสรรค์ ดวงพัตรา - รีรา ไวยหงษ์ รินทร์ศรี - อาเล็ก จรรยาทรัพย์กิจ)   ประเสริฐ เสียงสุทธิวงศ์ - ย่อ     เมธี ประจงการ - ตรวจ,
"#;

/// Section labels the model is asked to insert, in the order they appear.
pub const SECTION_LABELS: [&str; 3] = ["เรื่อง:", "ประเด็นหลัก:", "รายละเอียด:"];

/// Build the user turn: the file name followed by its (already trimmed) text.
pub fn verdict_user_message(filename: &str, content: &str) -> String {
    format!("Filename: {filename}\n\nContent:\n{content}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_every_section_label() {
        for label in SECTION_LABELS {
            assert!(
                VERDICT_SYSTEM_PROMPT.contains(&format!("\"{label}\"")),
                "prompt is missing {label}"
            );
        }
    }

    #[test]
    fn system_prompt_asks_for_numeral_conversion() {
        assert!(VERDICT_SYSTEM_PROMPT.contains("แปลงเลขไทย"));
        assert!(VERDICT_SYSTEM_PROMPT.contains("เอาเลขหน้าออก"));
    }

    #[test]
    fn user_message_layout() {
        let msg = verdict_user_message("1234-2560.txt", "คำพิพากษาศาลฎีกาที่ ๑๒๓๔/๒๕๖๐");
        assert_eq!(
            msg,
            "Filename: 1234-2560.txt\n\nContent:\nคำพิพากษาศาลฎีกาที่ ๑๒๓๔/๒๕๖๐"
        );
    }
}
